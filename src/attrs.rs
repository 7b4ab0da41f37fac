//! Free-text attribute parsing.
//!
//! Collection bonuses arrive as display strings like "HP +1250" or
//! "Danos Críticos 50%". The trailing numeric token becomes a typed value;
//! a string without one is kept whole with a null value so it still shows
//! up downstream instead of being dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Trailing number token: optional sign (ASCII or minus sign U+2212),
/// optional decimals, optional percent suffix, at end of string.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([+\-−]?\d+(?:\.\d+)?%?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Number,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedAttribute {
    /// `None` when the string had no trailing number.
    pub value: Option<f64>,
    pub unit: Option<Unit>,
    /// Original input, untrimmed.
    pub raw: String,
}

/// Parse raw attribute strings into a map keyed by attribute name.
///
/// Never fails: unparsable strings map to a null value under the whole
/// string, and a later duplicate name overwrites the earlier entry.
pub fn parse_attributes(values: &[String]) -> HashMap<String, ParsedAttribute> {
    let mut out = HashMap::new();
    for raw in values {
        let trimmed = raw.trim();
        match NUMBER_RE.captures(trimmed) {
            Some(caps) => {
                let token = caps.get(1).unwrap();
                let name = trimmed[..token.start()].trim();
                // "+100" alone: no name prefix, keep the whole string as key.
                let name = if name.is_empty() { trimmed } else { name };
                let unit = if token.as_str().ends_with('%') {
                    Unit::Percent
                } else {
                    Unit::Number
                };
                out.insert(
                    name.to_string(),
                    ParsedAttribute {
                        value: Some(parse_number(token.as_str())),
                        unit: Some(unit),
                        raw: raw.clone(),
                    },
                );
            }
            None => {
                out.insert(
                    trimmed.to_string(),
                    ParsedAttribute {
                        value: None,
                        unit: None,
                        raw: raw.clone(),
                    },
                );
            }
        }
    }
    out
}

/// Numeric token to f64: fullwidth plus and sign-plus are dropped, the
/// minus sign U+2212 counts as ASCII minus, a percent suffix is stripped.
fn parse_number(token: &str) -> f64 {
    let cleaned = token.replace('＋', "+").replace('−', "-").replace('+', "");
    let cleaned = cleaned.strip_suffix('%').unwrap_or(cleaned.as_str());
    cleaned.parse().unwrap_or(0.0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(raw: &str) -> (String, ParsedAttribute) {
        let parsed = parse_attributes(&[raw.to_string()]);
        assert_eq!(parsed.len(), 1, "input {:?} should yield one entry", raw);
        parsed.into_iter().next().unwrap()
    }

    #[test]
    fn test_plain_number_attribute() {
        let (name, attr) = parse_one("HP +1250");
        assert_eq!(name, "HP");
        assert_eq!(attr.value, Some(1250.0));
        assert_eq!(attr.unit, Some(Unit::Number));
        assert_eq!(attr.raw, "HP +1250");
    }

    #[test]
    fn test_percent_attribute() {
        let (name, attr) = parse_one("Danos Críticos 50%");
        assert_eq!(name, "Danos Críticos");
        assert_eq!(attr.value, Some(50.0));
        assert_eq!(attr.unit, Some(Unit::Percent));
    }

    #[test]
    fn test_multiword_name_with_pve_prefix() {
        let (name, attr) = parse_one("PVE Defesa +140");
        assert_eq!(name, "PVE Defesa");
        assert_eq!(attr.value, Some(140.0));
    }

    #[test]
    fn test_decimal_value() {
        let (name, attr) = parse_one("Taxa de Acerto 12.5%");
        assert_eq!(name, "Taxa de Acerto");
        assert_eq!(attr.value, Some(12.5));
        assert_eq!(attr.unit, Some(Unit::Percent));
    }

    #[test]
    fn test_unicode_minus_sign() {
        let (name, attr) = parse_one("Penalidade −5");
        assert_eq!(name, "Penalidade");
        assert_eq!(attr.value, Some(-5.0));
    }

    #[test]
    fn test_no_trailing_number_keeps_whole_string() {
        let (name, attr) = parse_one("Aparência exclusiva");
        assert_eq!(name, "Aparência exclusiva");
        assert_eq!(attr.value, None);
        assert_eq!(attr.unit, None);
        assert_eq!(attr.raw, "Aparência exclusiva");
    }

    #[test]
    fn test_bare_number_uses_itself_as_name() {
        let (name, attr) = parse_one("+100");
        assert_eq!(name, "+100");
        assert_eq!(attr.value, Some(100.0));
        assert_eq!(attr.unit, Some(Unit::Number));
    }

    #[test]
    fn test_input_is_trimmed_but_raw_is_not() {
        let (name, attr) = parse_one("  HP +10  ");
        assert_eq!(name, "HP");
        assert_eq!(attr.raw, "  HP +10  ");
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let parsed = parse_attributes(&["HP +10".to_string(), "HP +20".to_string()]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("HP").unwrap().value, Some(20.0));
        assert_eq!(parsed.get("HP").unwrap().raw, "HP +20");
    }

    #[test]
    fn test_number_in_middle_is_part_of_name() {
        let (name, attr) = parse_one("Tier 2 Bônus");
        assert_eq!(name, "Tier 2 Bônus");
        assert_eq!(attr.value, None);
    }

    #[test]
    fn test_empty_string_yields_null_entry() {
        let (name, attr) = parse_one("");
        assert_eq!(name, "");
        assert_eq!(attr.value, None);
    }
}
