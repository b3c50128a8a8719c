use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

/// Fetch the license for a Python package from PyPI.
pub async fn fetch_license(
    client: &Client,
    name: &str,
    version: Option<&str>,
) -> Result<Option<String>> {
    let url = match version {
        Some(v) => format!("https://pypi.org/pypi/{}/{}/json", name, v),
        None => format!("https://pypi.org/pypi/{}/json", name),
    };

    let response = client
        .get(&url)
        .header("User-Agent", super::USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Ok(None);
    }

    let data: Value = response.json().await?;
    Ok(license_from_info(&data))
}

/// Prefer the SPDX `license_expression`, then a short `license` field, then the
/// last `License ::` trove classifier.
fn license_from_info(data: &Value) -> Option<String> {
    let info = data.get("info")?;
    let field = |key: &str| {
        info.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if let Some(expr) = field("license_expression") {
        return Some(expr.to_string());
    }

    // Some packages paste the whole license text into this field.
    if let Some(license) = field("license").filter(|l| !l.contains('\n')) {
        return Some(license.to_string());
    }

    info.get("classifiers")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
        .filter_map(|c| c.as_str())
        .filter(|c| c.starts_with("License ::"))
        .filter_map(|c| c.rsplit(" :: ").next())
        .last()
        .map(str::to_string)
}
