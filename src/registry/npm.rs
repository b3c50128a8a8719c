use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use crate::analyzer::node::parse_license;
use crate::models::UNKNOWN;

/// Fetch the license for an npm package from the npm registry.
pub async fn fetch_license(
    client: &Client,
    name: &str,
    version: Option<&str>,
) -> Result<Option<String>> {
    // npm registry endpoint: GET /{name}/{version}
    // Scoped packages need URL encoding: @scope/pkg → %40scope%2Fpkg
    let encoded_name = name.replace('@', "%40").replace('/', "%2F");
    let url = match version {
        Some(v) => format!("https://registry.npmjs.org/{}/{}", encoded_name, v),
        None => format!("https://registry.npmjs.org/{}/latest", encoded_name),
    };

    let response = client
        .get(&url)
        .header("User-Agent", super::USER_AGENT)
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Ok(None);
    }

    let data: Value = response.json().await?;
    Ok(license_from_manifest(&data))
}

/// License of a version manifest, in any of the shapes `package.json` allows.
fn license_from_manifest(data: &Value) -> Option<String> {
    let field = data.get("license").or_else(|| data.get("licenses"));
    Some(parse_license(field)).filter(|l| l != UNKNOWN)
}
