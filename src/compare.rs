//! Two-character attribute comparison.
//!
//! Both characters' bonus strings are parsed into attribute maps, then
//! merged into one row per attribute name with values, diffs and display
//! annotations. A fixed list of high-value combat stats is pulled to the
//! front of the ordered view; "Ignorar"-prefixed variants of those stats are
//! deliberately kept out of it.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::armory::ArmoryApi;
use crate::attrs::{parse_attributes, ParsedAttribute, Unit};
use crate::logging::{log, obj, v_str, Domain, Level};

/// Stats given priority placement in comparison views, in display order.
pub const SPECIAL_ATTRIBUTES: [&str; 8] = [
    "Perfuração",
    "PVE Perfuração",
    "Danos Críticos",
    "PVE Dano Crítico",
    "Aumentou todas as técnicas Amp.",
    "PVE Todas as Técnicas Amp",
    "Aumentou todos os ataques",
    "PVE Todos os Ataques",
];

/// Leading "Ignorar" / "PVE Ignorar" marker, any case.
static IGNORE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(PVE\s+)?Ignorar\s+").unwrap());

/// Unit of one comparison row. `Mixed` means the two sides disagreed,
/// including one side having no unit at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowUnit {
    Number,
    Percent,
    Mixed,
}

impl RowUnit {
    fn from_sides(a: Option<Unit>, b: Option<Unit>) -> Option<RowUnit> {
        if a == b {
            a.map(|unit| match unit {
                Unit::Number => RowUnit::Number,
                Unit::Percent => RowUnit::Percent,
            })
        } else {
            Some(RowUnit::Mixed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRow {
    pub attribute: String,
    /// Missing side reads as 0 so the diff is always defined.
    pub value_a: f64,
    pub value_b: f64,
    pub unit: Option<RowUnit>,
    pub diff: f64,
    pub raw_a: Option<String>,
    pub raw_b: Option<String>,
    pub cleaned_attribute: String,
    pub parsed_key: String,
    pub is_special: bool,
    pub had_ignore_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeAnnotation {
    pub raw: String,
    pub cleaned: String,
    pub parsed_key: String,
    pub is_special: bool,
    pub had_ignore_prefix: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompareResult {
    pub name_a: Option<String>,
    pub name_b: Option<String>,
    pub character_idx_a: Option<i64>,
    pub character_idx_b: Option<i64>,
    pub values_a: Vec<String>,
    pub values_b: Vec<String>,
    pub collection_data_a: Vec<Value>,
    pub collection_data_b: Vec<Value>,
    /// One row per attribute present on either side, name order.
    pub detailed: Vec<CompareRow>,
    /// Same rows with specials pulled to the front.
    pub detailed_ordered: Vec<CompareRow>,
    pub common: Vec<String>,
    pub only_a: Vec<String>,
    pub only_b: Vec<String>,
    pub common_annotated: Vec<AttributeAnnotation>,
    pub only_a_annotated: Vec<AttributeAnnotation>,
    pub only_b_annotated: Vec<AttributeAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparePayload {
    /// False when either name was blank; the result then carries only the
    /// names and no fetch happened.
    pub comparison_ready: bool,
    pub result: CompareResult,
}

pub struct CompareBuilder {
    client: Arc<dyn ArmoryApi>,
}

impl CompareBuilder {
    pub fn new(client: Arc<dyn ArmoryApi>) -> Self {
        Self { client }
    }

    /// Compare two characters' collection attributes. An unknown character
    /// contributes an empty side rather than failing the comparison.
    pub async fn call(&self, name_a: &str, name_b: &str) -> Result<ComparePayload> {
        let name_a = presence(name_a);
        let name_b = presence(name_b);
        let mut result = CompareResult {
            name_a: name_a.clone(),
            name_b: name_b.clone(),
            ..CompareResult::default()
        };

        let (Some(name_a), Some(name_b)) = (name_a, name_b) else {
            return Ok(ComparePayload {
                comparison_ready: false,
                result,
            });
        };

        let (idx_a, idx_b) = tokio::join!(
            self.client.fetch_character_idx(&name_a),
            self.client.fetch_character_idx(&name_b)
        );
        result.character_idx_a = idx_a?;
        result.character_idx_b = idx_b?;

        if let Some(idx) = result.character_idx_a {
            let details = self.client.fetch_collection_details(idx).await?;
            result.values_a = details.values;
            result.collection_data_a = details.data;
        }
        if let Some(idx) = result.character_idx_b {
            let details = self.client.fetch_collection_details(idx).await?;
            result.values_b = details.values;
            result.collection_data_b = details.data;
        }

        let parsed_a = parse_attributes(&result.values_a);
        let parsed_b = parse_attributes(&result.values_b);

        result.detailed = build_detailed_rows(&parsed_a, &parsed_b);
        result.detailed_ordered = order_detailed_rows(&result.detailed);

        result.common = sorted_keys(&parsed_a, |k| parsed_b.contains_key(k));
        result.only_a = sorted_keys(&parsed_a, |k| !parsed_b.contains_key(k));
        result.only_b = sorted_keys(&parsed_b, |k| !parsed_a.contains_key(k));
        result.common_annotated = annotate_all(&result.common);
        result.only_a_annotated = annotate_all(&result.only_a);
        result.only_b_annotated = annotate_all(&result.only_b);

        log(
            Level::Debug,
            Domain::Compare,
            "built",
            obj(&[
                ("name_a", v_str(&name_a)),
                ("name_b", v_str(&name_b)),
                ("rows", json!(result.detailed.len())),
                ("common", json!(result.common.len())),
                ("only_a", json!(result.only_a.len())),
                ("only_b", json!(result.only_b.len())),
            ]),
        );

        Ok(ComparePayload {
            comparison_ready: true,
            result,
        })
    }
}

/// The original string when it has any non-whitespace, untrimmed.
fn presence(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn sorted_keys<F>(parsed: &HashMap<String, ParsedAttribute>, keep: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut keys: Vec<String> = parsed.keys().filter(|k| keep(k.as_str())).cloned().collect();
    keys.sort();
    keys
}

fn annotate_all(keys: &[String]) -> Vec<AttributeAnnotation> {
    keys.iter().map(|k| annotate_value(k)).collect()
}

fn build_detailed_rows(
    parsed_a: &HashMap<String, ParsedAttribute>,
    parsed_b: &HashMap<String, ParsedAttribute>,
) -> Vec<CompareRow> {
    let mut keys: Vec<&String> = parsed_a.keys().chain(parsed_b.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .map(|key| {
            let a = parsed_a.get(key);
            let b = parsed_b.get(key);
            let value_a = a.and_then(|p| p.value).unwrap_or(0.0);
            let value_b = b.and_then(|p| p.value).unwrap_or(0.0);
            let annotation = annotate_value(key);
            CompareRow {
                attribute: key.clone(),
                value_a,
                value_b,
                unit: RowUnit::from_sides(a.and_then(|p| p.unit), b.and_then(|p| p.unit)),
                diff: value_a - value_b,
                raw_a: a.map(|p| p.raw.clone()),
                raw_b: b.map(|p| p.raw.clone()),
                cleaned_attribute: annotation.cleaned,
                parsed_key: annotation.parsed_key,
                is_special: annotation.is_special,
                had_ignore_prefix: annotation.had_ignore_prefix,
            }
        })
        .collect()
}

/// Specials first in the fixed list order, the rest keeping name order.
fn order_detailed_rows(rows: &[CompareRow]) -> Vec<CompareRow> {
    let mut special: Vec<CompareRow> = rows.iter().filter(|r| r.is_special).cloned().collect();
    special.sort_by_key(|row| special_rank(&row.parsed_key));
    special
        .into_iter()
        .chain(rows.iter().filter(|r| !r.is_special).cloned())
        .collect()
}

fn special_rank(parsed_key: &str) -> usize {
    SPECIAL_ATTRIBUTES
        .iter()
        .position(|s| *s == parsed_key)
        .unwrap_or(SPECIAL_ATTRIBUTES.len())
}

/// Classify one attribute string: strip the ignore marker, re-parse the
/// remainder to get the bare attribute name, and check that name against the
/// special list. A marked string is never special, so an ignored variant of
/// a priority stat cannot rank alongside the real one.
pub fn annotate_value(raw: &str) -> AttributeAnnotation {
    let original = raw.trim();
    let had_ignore_prefix = IGNORE_PREFIX_RE.is_match(original);
    let cleaned = if had_ignore_prefix {
        IGNORE_PREFIX_RE.replace(original, "").trim().to_string()
    } else {
        original.to_string()
    };

    let parsed = parse_attributes(&[cleaned.clone()]);
    let mut parsed_key = parsed.keys().next().cloned().unwrap_or_default();
    if parsed_key.trim().is_empty() {
        parsed_key = cleaned.clone();
    }

    let is_special = !had_ignore_prefix && SPECIAL_ATTRIBUTES.contains(&parsed_key.as_str());
    AttributeAnnotation {
        raw: raw.to_string(),
        cleaned,
        parsed_key,
        is_special,
        had_ignore_prefix,
    }
}

// =============================================================================
// Tests
// =============================================================================
