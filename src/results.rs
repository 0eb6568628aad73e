use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canonical job posting extracted from a detail page.
///
/// Every field except `url`, `source` and `scraped_at` may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub url: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
    pub employment_type: Option<String>,
    pub valid_through: Option<String>,
    pub salary: Option<String>,
    pub description_html: Option<String>,
    /// Plain-text projection of `description_html`
    pub description_text: Option<String>,
    pub language: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a record with only the mandatory fields set
    pub fn new(url: String, source: String) -> Self {
        Self {
            url,
            title: None,
            company: None,
            location: None,
            date_posted: None,
            employment_type: None,
            valid_through: None,
            salary: None,
            description_html: None,
            description_text: None,
            language: None,
            source,
            scraped_at: Utc::now(),
        }
    }
}

/// A job URL emitted without visiting its page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredLink {
    pub url: String,
    pub source: String,
    /// Listing page the link was found on
    pub discovered_on: String,
    pub page_no: u32,
    pub scraped_at: DateTime<Utc>,
}

/// One item written to the output sink.
///
/// `Link` comes first: a job record line lacks `discoveredOn` and falls
/// through to `Job`, while every link line would also parse as a `Job`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Output {
    Link(DiscoveredLink),
    Job(JobRecord),
}

impl Output {
    pub fn url(&self) -> &str {
        match self {
            Output::Job(job) => &job.url,
            Output::Link(link) => &link.url,
        }
    }

    pub fn as_job(&self) -> Option<&JobRecord> {
        match self {
            Output::Job(job) => Some(job),
            Output::Link(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_record_serializes_camel_case_with_nulls() {
        let record = JobRecord::new(
            "https://www.rekrute.com/offre-emploi-dev-1.html".to_string(),
            "rekrute".to_string(),
        );
        let value = serde_json::to_value(Output::Job(record)).unwrap();

        assert_eq!(value["url"], "https://www.rekrute.com/offre-emploi-dev-1.html");
        assert!(value["datePosted"].is_null());
        assert!(value["descriptionHtml"].is_null());
        assert!(value.get("scrapedAt").is_some());
    }

    #[test]
    fn test_discovered_link_shape() {
        let link = DiscoveredLink {
            url: "https://www.rekrute.com/offre-emploi-dev-1.html".to_string(),
            source: "rekrute".to_string(),
            discovered_on: "https://www.rekrute.com/offres.html".to_string(),
            page_no: 2,
            scraped_at: Utc::now(),
        };
        let value = serde_json::to_value(Output::Link(link)).unwrap();
        assert_eq!(value["discoveredOn"], "https://www.rekrute.com/offres.html");
        assert_eq!(value["pageNo"], 2);
        assert!(value.get("title").is_none());
    }

    #[test]
    fn test_output_lines_read_back_as_the_same_variant() {
        let link = Output::Link(DiscoveredLink {
            url: "https://www.rekrute.com/offre-emploi-dev-1.html".to_string(),
            source: "rekrute".to_string(),
            discovered_on: "https://www.rekrute.com/offres.html?p=2".to_string(),
            page_no: 2,
            scraped_at: Utc::now(),
        });
        let mut record = JobRecord::new(
            "https://www.rekrute.com/offre-emploi-dev-2.html".to_string(),
            "rekrute".to_string(),
        );
        record.title = Some("Développeur".to_string());
        let job = Output::Job(record);

        for output in [link, job] {
            let line = serde_json::to_string(&output).unwrap();
            let back: Output = serde_json::from_str(&line).unwrap();
            assert_eq!(back, output);
        }
    }
}
