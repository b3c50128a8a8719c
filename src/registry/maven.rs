use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

/// Fetch the license for a Maven artifact from Maven Central.
///
/// The `name` is expected in `groupId:artifactId` format (as stored in our models).
pub async fn fetch_license(client: &Client, name: &str, version: &str) -> Result<Option<String>> {
    let Some((group_id, artifact_id)) = name.split_once(':') else {
        return Ok(None);
    };
    if group_id.is_empty() || artifact_id.is_empty() {
        return Ok(None);
    }

    // Maven Central POM URL
    let group_path = group_id.replace('.', "/");
    let pom_url = format!(
        "https://repo1.maven.org/maven2/{}/{}/{}/{}-{}.pom",
        group_path, artifact_id, version, artifact_id, version
    );

    let response = client
        .get(&pom_url)
        .header("User-Agent", super::USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Ok(None);
    }

    let pom_xml = response.text().await?;
    Ok(extract_license_from_pom(&pom_xml))
}

const LICENSE_NAME_PATH: [&str; 4] = ["project", "licenses", "license", "name"];

/// Extract the first `project/licenses/license/name` from a POM XML string.
///
/// POMs that inherit their license from a parent have none; that is `None`,
/// as is XML that fails to parse.
fn extract_license_from_pom(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                stack.push(tag);
            }
            Ok(Event::Text(ref e)) if stack == LICENSE_NAME_PATH => {
                if let Ok(text) = e.unescape() {
                    let name = text.trim();
                    if !name.is_empty() {
                        return Some(name.to_string());
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    None
}
