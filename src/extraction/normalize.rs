//! Canonicalization of tagger labels and entity surface forms.

use crate::domain::EntityType;
use chrono::NaiveDate;

/// Date layouts tried, in order, before falling back to the raw string.
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Map a tagger label onto the canonical tag vocabulary.
///
/// Unknown labels are upper-cased and kept, so they land on the generic
/// entity type without losing the tagger's wording.
pub fn canonical_tag(raw: &str) -> String {
    let upper = raw.trim().to_uppercase().replace([' ', '-'], "_");
    let tag = match upper.as_str() {
        "CASE" | "CASE_CITATION" | "CITATION" => "CASE",
        "PRECEDENT" => "PRECEDENT",
        "STATUTE" | "STATUTE_REFERENCE" | "ACT" | "LAW" => "STATUTE",
        "PROVISION" | "SECTION" | "ARTICLE" => "PROVISION",
        "CLAUSE" | "LEGAL_CLAUSE" => "CLAUSE",
        "COURT" => "COURT",
        "JUDGE" | "JUSTICE" | "JUDICIAL_ENTITY" => "JUDGE",
        "JURISDICTION" | "GPE" | "LOC" => "JURISDICTION",
        "PETITIONER" | "APPELLANT" | "PLAINTIFF" => "PETITIONER",
        "RESPONDENT" | "APPELLEE" | "DEFENDANT" => "RESPONDENT",
        "PARTY" | "LEGAL_PARTY" | "PERSON" | "PER" | "ORG" | "ORGANIZATION" => "PARTY",
        "PRINCIPLE" | "LEGAL_PRINCIPLE" | "DOCTRINE" => "PRINCIPLE",
        "DATE" | "LEGAL_DATE" | "TIME" => "DATE",
        "PROCEDURE" | "LEGAL_PROCEDURE" | "MOTION" => "PROCEDURE",
        _ => return upper,
    };
    tag.to_string()
}

/// Canonical form of an entity's text, used as half of its dedup key.
pub fn normalize_value(entity_type: EntityType, text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    match entity_type {
        EntityType::CaseCitation => normalize_case_citation(&collapsed),
        EntityType::StatuteReference => normalize_statute(&collapsed),
        EntityType::LegalDate => normalize_date(&collapsed),
        _ => collapsed.to_lowercase(),
    }
}

/// "Jones v. Smith" and "jones vs. smith" both become "jones_v_smith".
pub fn normalize_case_citation(citation: &str) -> String {
    let lower = citation.to_lowercase();
    [" vs. ", " vs ", " v. ", " v "]
        .iter()
        .fold(lower, |acc, sep| acc.replace(sep, "_v_"))
}

/// "42 U.S.C. § 1983" becomes "42u.s.c.section1983".
pub fn normalize_statute(statute: &str) -> String {
    statute
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace('§', "section")
        .to_lowercase()
}

/// Parse a date into ISO-8601 (`YYYY-MM-DD`). Unparseable input is kept
/// as-is; that fallback is expected, not an error.
pub fn normalize_date(date: &str) -> String {
    let trimmed = date.trim();
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed.format("%Y-%m-%d").to_string();
        }
    }
    tracing::debug!(date = %trimmed, "Date not normalized, keeping raw value");
    trimmed.to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Largest char boundary at or below `idx`.
pub fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary at or above `idx`.
pub fn ceil_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Substring around `[start, end)` widened by `window` bytes on each side.
pub fn context_window(text: &str, start: usize, end: usize, window: usize) -> &str {
    let from = floor_boundary(text, start.saturating_sub(window));
    let to = ceil_boundary(text, end.saturating_add(window));
    if from >= to { "" } else { &text[from..to] }
}

/// Substring `[start, end)` snapped outward to char boundaries.
pub fn slice(text: &str, start: usize, end: usize) -> &str {
    context_window(text, start, end, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_tag() {
        assert_eq!(canonical_tag("case_citation"), "CASE");
        assert_eq!(canonical_tag("Appellant"), "PETITIONER");
        assert_eq!(canonical_tag("judicial entity"), "JUDGE");
        assert_eq!(canonical_tag("widget"), "WIDGET");
    }

    #[test]
    fn test_case_citation_normalization() {
        assert_eq!(normalize_case_citation("Jones v. Smith"), "jones_v_smith");
        assert_eq!(
            normalize_value(EntityType::CaseCitation, "Jones  vs.   Smith"),
            "jones_v_smith"
        );
    }

    #[test]
    fn test_statute_normalization() {
        assert_eq!(normalize_statute("42 U.S.C. § 1983"), "42u.s.c.section1983");
    }

    #[test]
    fn test_date_normalization_and_fallback() {
        assert_eq!(normalize_date("March 3, 2021"), "2021-03-03");
        assert_eq!(normalize_date("3 March 2021"), "2021-03-03");
        assert_eq!(normalize_date("sometime in spring"), "sometime in spring");
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "ééé Jones v. Smith ééé";
        let start = text.find("Jones").unwrap();
        let end = start + "Jones v. Smith".len();
        let ctx = context_window(text, start, end, 3);
        assert!(ctx.contains("Jones v. Smith"));
        assert_eq!(context_window(text, 0, 1, 0), "é");
        assert_eq!(slice(text, 100, 200), "");
    }
}
