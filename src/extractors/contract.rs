//! Contract type and salary detection in free text.

use regex::Regex;
use std::sync::LazyLock;

use crate::text;

/// Canonical contract types, most specific first, with the patterns that signal them
static CONTRACT_TYPES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("CDI", r"(?i)\bcdi\b|durée indéterminée|duree indeterminee|\bpermanent\b"),
        ("CDD", r"(?i)\bcdd\b|durée déterminée|duree determinee|fixed[- ]term|\btemporary\b"),
        ("Internship", r"(?i)\bstages?\b|\bstagiaires?\b|\binternships?\b|\bpfe\b"),
        ("Freelance", r"(?i)\bfree[- ]?lance\b|\bindépendant\b|\bcontractor\b"),
        ("Part-time", r"(?i)temps partiel|\bpart[- ]time\b"),
        ("Full-time", r"(?i)temps plein|\bfull[- ]time\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid contract pattern")))
    .collect()
});

/// "Type de contrat : CDI" style labels
static CONTRACT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:type\s+de\s+contrat|contrat|contract\s+type|employment\s+type)\s*:\s*([^\n|]{2,60})")
        .expect("valid label pattern")
});

static SALARY_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)(?:salaire|rémunération|remuneration|salary|compensation)(?:\s+(?:proposée?|offered|brut|net))?\s*:\s*([^\n;|]{2,60})",
    )
    .expect("valid salary label pattern")
});

const CURRENCY: &str = r"(?:(?:MAD|DHS?|dirhams?|EUR|euros?|USD)\b|€|\$)";
const AMOUNT: &str = r"\d(?:[\d \x{a0}.,]*\d)?";

static SALARY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    let suffix = format!(
        r"(?i){AMOUNT}(?:\s*(?:-|–|à|to)\s*{AMOUNT})?\s*[kK]?\s*{CURRENCY}"
    );
    Regex::new(&suffix).expect("valid salary pattern")
});

static SALARY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    let prefix = format!(r"(?i)(?:€|\$|\b(?:MAD|EUR|USD)\b)\s*{AMOUNT}(?:\s*(?:-|–|à|to)\s*{AMOUNT})?\s*[kK]?");
    Regex::new(&prefix).expect("valid salary pattern")
});

/// Canonical contract type mentioned in `text`, if any.
///
/// An explicit "Type de contrat :" label is preferred over a bare keyword
/// found elsewhere.
pub fn employment_type(text: &str) -> Option<String> {
    for caps in CONTRACT_LABEL.captures_iter(text) {
        if let Some(kind) = keyword_type(&caps[1]) {
            return Some(kind.to_string());
        }
    }
    keyword_type(text).map(str::to_string)
}

fn keyword_type(text: &str) -> Option<&'static str> {
    CONTRACT_TYPES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

/// Map schema.org employment types onto the canonical names
pub fn canonical_schema_type(raw: &str) -> String {
    match raw.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
        "FULL_TIME" => "Full-time".to_string(),
        "PART_TIME" => "Part-time".to_string(),
        "INTERN" | "INTERNSHIP" => "Internship".to_string(),
        "CONTRACTOR" | "FREELANCE" => "Freelance".to_string(),
        "TEMPORARY" | "CDD" => "CDD".to_string(),
        "PERMANENT" | "CDI" => "CDI".to_string(),
        _ => keyword_type(raw).map_or_else(|| raw.trim().to_string(), str::to_string),
    }
}

/// Salary mentioned in `text`: a labeled phrase first, then an amount next
/// to a currency.
pub fn salary(text: &str) -> Option<String> {
    if let Some(caps) = SALARY_LABEL.captures(text) {
        let value = caps[1].trim().trim_end_matches(['.', ',']);
        if value.chars().any(|c| c.is_ascii_digit()) {
            return text::clean(value);
        }
    }
    SALARY_AMOUNT
        .find(text)
        .or_else(|| SALARY_PREFIX.find(text))
        .and_then(|m| text::clean(m.as_str()))
}
