//! Async HTTP clients for fetching license data from upstream package registries.
//!
//! Each module exposes a single `fetch_license(client, name, version)` function
//! that returns `Ok(Some(license_string))` on success, `Ok(None)` when the
//! package is not found or has no license field, and `Err` on network failures.
//! Only used for dependencies still at `UNKNOWN` after scanning.

pub mod maven;
pub mod npm;
pub mod pypi;
pub mod rubygems;

use anyhow::Result;
use reqwest::Client;

use crate::models::{Ecosystem, UNKNOWN};

pub(crate) const USER_AGENT: &str = concat!("license-audit/", env!("CARGO_PKG_VERSION"));

/// Whether `ecosystem` has a registry client.
pub fn supports(ecosystem: Ecosystem) -> bool {
    matches!(
        ecosystem,
        Ecosystem::Npm | Ecosystem::Python | Ecosystem::Maven | Ecosystem::Ruby
    )
}

/// Query the registry for `ecosystem`. Ecosystems without a client yield `None`.
pub async fn fetch_license(
    client: &Client,
    ecosystem: Ecosystem,
    name: &str,
    version: &str,
) -> Result<Option<String>> {
    let version = pinned_version(version);
    match ecosystem {
        Ecosystem::Npm => npm::fetch_license(client, name, version).await,
        Ecosystem::Python => pypi::fetch_license(client, name, version).await,
        Ecosystem::Maven => match version {
            Some(v) => maven::fetch_license(client, name, v).await,
            None => Ok(None),
        },
        Ecosystem::Ruby => rubygems::fetch_license(client, name, version).await,
        _ => Ok(None),
    }
}

/// An exact version usable in a registry URL, or `None` for ranges and
/// unknown versions (the registries then report the latest release).
pub fn pinned_version(version: &str) -> Option<&str> {
    let version = version.trim().trim_start_matches('=').trim();
    if version.is_empty() || version == UNKNOWN {
        return None;
    }
    let exact = version.starts_with(|c: char| c.is_ascii_digit())
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    exact.then_some(version)
}
