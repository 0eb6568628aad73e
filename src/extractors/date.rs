//! Posting and expiry dates from the page text.

use regex::Regex;
use std::sync::LazyLock;

use super::Page;

/// `12/05/2024`, `1-6-24`, `12.05.2024` or `12 mai 2024`
const DATE: &str = r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}|\d{1,2}\s+\p{L}+\.?\s+\d{4}";

static LABELED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:publi[ée]e?s?|mise?\s+en\s+ligne|published|posted)[^\d\n]{{0,25}}?({DATE})"
    ))
    .expect("valid date pattern")
});

/// "Publiée du 12/05/2024 au 30/06/2024"
static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:publi[ée]e?s?|published|posted)[^\d\n]{{0,25}}?(?:{DATE})\s*(?:au|jusqu'au|to|until|-)\s*({DATE})"
    ))
    .expect("valid date range pattern")
});

static ANY_NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}\b").expect("valid date pattern")
});

/// Labeled publication date, else the first numeric date in the body
pub fn date_posted(page: &Page<'_>) -> Option<String> {
    labeled(page.lines()).or_else(|| first_date(page.lines()))
}

/// End of a "published from ... to ..." range
pub fn valid_through(page: &Page<'_>) -> Option<String> {
    DATE_RANGE
        .captures(page.lines())
        .map(|caps| caps[1].trim().to_string())
}

fn labeled(text: &str) -> Option<String> {
    LABELED_DATE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

fn first_date(text: &str) -> Option<String> {
    ANY_NUMERIC_DATE.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_dates() {
        assert_eq!(labeled("Publiée le : 12/05/2024").as_deref(), Some("12/05/2024"));
        assert_eq!(labeled("Posted on 3 June 2024").as_deref(), Some("3 June 2024"));
        assert_eq!(labeled("Publié le 1-6-24 par RH").as_deref(), Some("1-6-24"));
        assert_eq!(labeled("Aucune date"), None);
    }

    #[test]
    fn test_first_date_anywhere() {
        let text = "Réf 2024\nCandidatures avant le 30.06.2024 et 01/07/2024";
        assert_eq!(first_date(text).as_deref(), Some("30.06.2024"));
        assert_eq!(first_date("Version 1.2.3"), None);
    }

    #[test]
    fn test_range_end() {
        let text = "Publiée du 12/05/2024 au 30/06/2024";
        let caps = DATE_RANGE.captures(text).unwrap();
        assert_eq!(&caps[1], "30/06/2024");
        assert_eq!(labeled(text).as_deref(), Some("12/05/2024"));
    }
}
