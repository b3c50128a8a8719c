use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

/// Fetch the license for a gem from rubygems.org.
pub async fn fetch_license(
    client: &Client,
    name: &str,
    version: Option<&str>,
) -> Result<Option<String>> {
    let url = match version {
        Some(v) => format!("https://rubygems.org/api/v2/rubygems/{}/versions/{}.json", name, v),
        None => format!("https://rubygems.org/api/v1/gems/{}.json", name),
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
    Ok(licenses_field(&data))
}

/// Both endpoints carry a `licenses` array; several entries are alternatives.
fn licenses_field(data: &Value) -> Option<String> {
    let licenses: Vec<&str> = data
        .get("licenses")?
        .as_array()?
        .iter()
        .filter_map(|l| l.as_str())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if licenses.is_empty() {
        None
    } else {
        Some(licenses.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_licenses_field() {
        assert_eq!(
            licenses_field(&json!({"name": "rack", "licenses": ["MIT"]})),
            Some("MIT".to_string())
        );
        assert_eq!(
            licenses_field(&json!({"licenses": ["Ruby", "BSD-2-Clause"]})),
            Some("Ruby OR BSD-2-Clause".to_string())
        );
        assert_eq!(licenses_field(&json!({"licenses": []})), None);
        assert_eq!(licenses_field(&json!({"licenses": null})), None);
    }
}
