//! schema.org `JobPosting` metadata embedded as JSON-LD.

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::text;

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// The parts of a `JobPosting` node the reconciler uses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdJobPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
    pub valid_through: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    /// HTML description as published in the metadata
    pub description: Option<String>,
}

/// Returns the first consistent `JobPosting` found in the document's JSON-LD
/// blocks. Blocks that fail to parse are skipped.
pub fn extract(document: &Html) -> Option<JsonLdJobPosting> {
    for script in document.select(&JSON_LD) {
        let raw: String = script.text().collect();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                ::log::debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };
        if let Some(posting) = find_job_posting(&value).and_then(to_posting) {
            return Some(posting);
        }
    }
    None
}

fn find_job_posting(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(map) => {
            if is_job_posting(value) {
                return Some(value);
            }
            map.get("@graph").and_then(find_job_posting)
        }
        _ => None,
    }
}

fn is_job_posting(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(kind)) => kind == "JobPosting",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("JobPosting")),
        _ => false,
    }
}

/// Project a node; nodes without a title or description are not usable
fn to_posting(node: &Value) -> Option<JsonLdJobPosting> {
    let posting = JsonLdJobPosting {
        title: string_field(node, "title").or_else(|| string_field(node, "name")),
        company: node.get("hiringOrganization").and_then(name_of),
        location: node.get("jobLocation").and_then(location_of),
        date_posted: string_field(node, "datePosted").map(|d| date_part(&d)),
        valid_through: string_field(node, "validThrough").map(|d| date_part(&d)),
        employment_type: node.get("employmentType").and_then(employment_type_of),
        salary: node.get("baseSalary").and_then(salary_of),
        description: node
            .get("description")
            .and_then(Value::as_str)
            .map(text::decode_entities)
            .filter(|d| !d.trim().is_empty()),
    };
    if posting.title.is_none() && posting.description.is_none() {
        return None;
    }
    Some(posting)
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(scalar).map(|s| text::decode_entities(&s)).and_then(|s| text::clean(&s))
}

/// Strings and numbers as text
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(name_of),
        Value::Object(_) => string_field(value, "name"),
        other => scalar(other).and_then(|s| text::clean(&s)),
    }
}

fn location_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(location_of),
        Value::String(s) => text::clean(s),
        Value::Object(_) => {
            let address = value.get("address").unwrap_or(value);
            if let Some(plain) = address.as_str() {
                return text::clean(plain);
            }
            string_field(address, "addressLocality")
                .or_else(|| string_field(address, "addressRegion"))
                .or_else(|| address.get("addressCountry").and_then(name_of))
        }
        _ => None,
    }
}

fn employment_type_of(value: &Value) -> Option<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    };
    let types: Vec<String> = raw
        .iter()
        .filter_map(|t| text::clean(t))
        .map(|t| super::contract::canonical_schema_type(&t))
        .collect();
    (!types.is_empty()).then(|| types.join(", "))
}

fn salary_of(value: &Value) -> Option<String> {
    let (amount, currency) = match value {
        Value::Object(_) => {
            let currency = string_field(value, "currency");
            let amount = match value.get("value") {
                Some(inner @ Value::Object(_)) => amount_of(inner),
                Some(other) => scalar(other),
                None => amount_of(value),
            };
            let currency = currency.or_else(|| {
                value
                    .get("value")
                    .and_then(|inner| string_field(inner, "currency"))
            });
            (amount, currency)
        }
        other => (scalar(other), None),
    };
    let parts: Vec<String> = [amount, currency]
        .into_iter()
        .flatten()
        .filter_map(|part| text::clean(&part))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn amount_of(node: &Value) -> Option<String> {
    if let Some(value) = node.get("value").and_then(scalar) {
        return Some(value);
    }
    let min = node.get("minValue").and_then(scalar);
    let max = node.get("maxValue").and_then(scalar);
    match (min, max) {
        (Some(min), Some(max)) if min != max => Some(format!("{min} - {max}")),
        (Some(min), _) => Some(min),
        (None, max) => max,
    }
}

/// `2024-05-01T10:00:00+01:00` -> `2024-05-01`
fn date_part(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.split_once('T') {
        Some((date, _)) if date.len() == 10 && date.as_bytes()[4] == b'-' => date.to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head><script type="application/ld+json">{json}</script></head><body></body></html>"#
        ))
    }

    #[test]
    fn test_basic_job_posting() {
        let html = doc(
            r#"{"@context":"https://schema.org","@type":"JobPosting","title":"Analyst",
                "hiringOrganization":{"@type":"Organization","name":"Beta"},
                "datePosted":"2024-05-01T08:00:00Z","validThrough":"2024-06-30",
                "employmentType":"FULL_TIME",
                "jobLocation":{"@type":"Place","address":{"addressLocality":"Casablanca","addressCountry":"MA"}},
                "baseSalary":{"@type":"MonetaryAmount","currency":"MAD",
                              "value":{"@type":"QuantitativeValue","minValue":10000,"maxValue":15000,"unitText":"MONTH"}},
                "description":"&lt;p&gt;Great job&lt;/p&gt;"}"#,
        );
        let posting = extract(&html).unwrap();
        assert_eq!(posting.title.as_deref(), Some("Analyst"));
        assert_eq!(posting.company.as_deref(), Some("Beta"));
        assert_eq!(posting.location.as_deref(), Some("Casablanca"));
        assert_eq!(posting.date_posted.as_deref(), Some("2024-05-01"));
        assert_eq!(posting.valid_through.as_deref(), Some("2024-06-30"));
        assert_eq!(posting.employment_type.as_deref(), Some("Full-time"));
        assert_eq!(posting.salary.as_deref(), Some("10000 - 15000 MAD"));
        assert_eq!(posting.description.as_deref(), Some("<p>Great job</p>"));
    }

    #[test]
    fn test_location_falls_back_to_region_then_country() {
        let html = doc(
            r#"{"@type":"JobPosting","title":"Dev",
                "jobLocation":[{"address":{"addressRegion":"Souss-Massa"}}]}"#,
        );
        assert_eq!(extract(&html).unwrap().location.as_deref(), Some("Souss-Massa"));

        let html = doc(
            r#"{"@type":"JobPosting","title":"Dev",
                "jobLocation":{"address":{"addressCountry":{"@type":"Country","name":"Maroc"}}}}"#,
        );
        assert_eq!(extract(&html).unwrap().location.as_deref(), Some("Maroc"));
    }

    #[test]
    fn test_graph_and_type_arrays() {
        let html = doc(
            r#"{"@context":"https://schema.org","@graph":[
                {"@type":"WebPage","name":"Page"},
                {"@type":["JobPosting","Thing"],"title":"Comptable"}]}"#,
        );
        assert_eq!(extract(&html).unwrap().title.as_deref(), Some("Comptable"));
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let html = Html::parse_document(
            r#"<html><head>
                <script type="application/ld+json">{"@type": "JobPosting", "title": </script>
                <script type="application/ld+json">{"@type":"JobPosting","title":"Second"}</script>
            </head><body></body></html>"#,
        );
        assert_eq!(extract(&html).unwrap().title.as_deref(), Some("Second"));
    }

    #[test]
    fn test_non_job_metadata_is_ignored() {
        let html = doc(r#"{"@type":"Organization","name":"ReKrute"}"#);
        assert!(extract(&html).is_none());

        // A JobPosting with neither title nor description is not usable
        let html = doc(r#"{"@type":"JobPosting","datePosted":"2024-01-01"}"#);
        assert!(extract(&html).is_none());
    }

    #[test]
    fn test_salary_scalar_value() {
        let html = doc(
            r#"{"@type":"JobPosting","title":"Dev",
                "baseSalary":{"currency":"EUR","value":{"value":"45000"}}}"#,
        );
        assert_eq!(extract(&html).unwrap().salary.as_deref(), Some("45000 EUR"));
    }
}
