//! Data shaping for the rendering layer: filter option lists, section
//! groupings and per-row comparison verdicts. No markup lives here, just the
//! plain values a view or JSON endpoint serializes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::compare::{AttributeAnnotation, CompareRow, RowUnit, SPECIAL_ATTRIBUTES};
use crate::snapshot::{
    aggregate_material_needs, Bucket, BucketMaterials, CollectionEntry, MaterialAggregate,
    ProgressBuckets,
};

/// Numeric value token inside a reward label, sign and percent included.
static REWARD_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+−]?\s*\d+(?:[.,]\d+)?\s*%?").unwrap());

/// Collapse whitespace runs to single spaces and trim the ends.
fn squish(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reward label reduced to its attribute wording: value tokens and
/// parentheses stripped, whitespace collapsed. Used to match reward labels
/// against filter options regardless of the rolled value.
pub fn normalize_reward_attribute(label: &str) -> String {
    let normalized = squish(label);
    if normalized.is_empty() {
        return String::new();
    }
    let stripped = REWARD_VALUE_RE.replace_all(&normalized, "");
    squish(&stripped.replace(['(', ')'], ""))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub status: Vec<String>,
    pub items: Vec<String>,
}

/// Status filter values for one entry: its reward descriptions, or the
/// comma-joined status string when no rewards survive, all normalized with
/// blanks dropped.
pub fn progress_status_filter_values(entry: &CollectionEntry) -> Vec<String> {
    let mut labels: Vec<String> = entry
        .rewards
        .iter()
        .map(|r| r.description.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if labels.is_empty() {
        labels = entry
            .status
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    labels
        .iter()
        .map(|l| normalize_reward_attribute(l))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Item filter values for one entry, preferring the precomputed rollup over
/// re-aggregating the raw materials.
pub fn progress_material_filter_values(entry: &CollectionEntry) -> Vec<String> {
    let aggregates = if entry.aggregated_materials.is_empty() {
        aggregate_material_needs(&entry.materials)
    } else {
        entry.aggregated_materials.clone()
    };
    aggregates
        .into_iter()
        .map(|m| m.name.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Distinct status and item filter options across every bucket, sorted
/// case-insensitively.
pub fn progress_filter_options(buckets: &ProgressBuckets) -> FilterOptions {
    FilterOptions {
        status: uniq_sorted(buckets.all_entries().flat_map(progress_status_filter_values)),
        items: uniq_sorted(
            buckets
                .all_entries()
                .flat_map(progress_material_filter_values),
        ),
    }
}

/// Normalized labels of the priority stats, deduplicated in list order.
pub fn progress_important_attributes() -> Vec<String> {
    let mut out = Vec::new();
    for label in SPECIAL_ATTRIBUTES {
        let normalized = normalize_reward_attribute(label);
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialsSection {
    pub key: String,
    pub label: String,
    pub items: Vec<MaterialAggregate>,
}

/// Non-empty materials sections in display order: the four buckets, then the
/// all-bucket rollup under "general".
pub fn materials_sections(
    materials_by_bucket: &BucketMaterials,
    top_materials: &[MaterialAggregate],
) -> Vec<MaterialsSection> {
    let mut sections = Vec::new();
    for bucket in Bucket::ALL {
        let items = materials_by_bucket.get(bucket);
        if items.is_empty() {
            continue;
        }
        sections.push(MaterialsSection {
            key: bucket.as_str().to_string(),
            label: bucket.label().to_string(),
            items: items.to_vec(),
        });
    }
    if !top_materials.is_empty() {
        sections.push(MaterialsSection {
            key: "general".to_string(),
            label: "General".to_string(),
            items: top_materials.to_vec(),
        });
    }
    sections
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialsFilterOptions {
    pub materials: Vec<String>,
    pub buckets: Vec<String>,
}

pub fn materials_filter_options(sections: &[MaterialsSection]) -> MaterialsFilterOptions {
    MaterialsFilterOptions {
        materials: uniq_sorted(
            sections
                .iter()
                .flat_map(|s| s.items.iter())
                .map(|i| i.name.trim().to_string())
                .filter(|s| !s.is_empty()),
        ),
        buckets: uniq_sorted(
            sections
                .iter()
                .map(|s| s.label.trim().to_string())
                .filter(|s| !s.is_empty()),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRef {
    pub tier: String,
    pub collection_name: String,
    pub bucket: Bucket,
}

/// Flat list of collection identities with their bucket, for views that key
/// materials back to their collections.
pub fn collection_refs(buckets: &ProgressBuckets) -> Vec<CollectionRef> {
    Bucket::ALL
        .iter()
        .flat_map(|&bucket| {
            buckets.get(bucket).iter().map(move |entry| CollectionRef {
                tier: entry.tier.clone(),
                collection_name: entry.name.clone(),
                bucket,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialCollectionsFilterOptions {
    pub collections: Vec<String>,
    pub buckets: Vec<String>,
}

pub fn material_collections_filter_options(
    refs: &[CollectionRef],
) -> MaterialCollectionsFilterOptions {
    MaterialCollectionsFilterOptions {
        collections: uniq_sorted(
            refs.iter()
                .map(|r| {
                    [r.tier.as_str(), r.collection_name.as_str()]
                        .iter()
                        .filter(|s| !s.trim().is_empty())
                        .copied()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|s| !s.is_empty()),
        ),
        buckets: uniq_sorted(
            refs.iter()
                .map(|r| r.bucket.label().to_string())
                .filter(|s| !s.is_empty()),
        ),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompareSectionGroups {
    pub special: Vec<AttributeAnnotation>,
    pub regular: Vec<AttributeAnnotation>,
}

/// Split an annotated attribute list into priority stats and the rest,
/// keeping relative order inside each group.
pub fn compare_section_groups(annotated: &[AttributeAnnotation]) -> CompareSectionGroups {
    let (special, regular) = annotated
        .iter()
        .cloned()
        .partition(|a| a.is_special);
    CompareSectionGroups { special, regular }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    A,
    B,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPresentation {
    pub winner: Winner,
    /// Signed diff ready to print: "+" prefixed when non-negative, decimal
    /// point always kept ("+6.0", "-2.5").
    pub diff_text: String,
    pub unit_suffix: &'static str,
}

pub fn compare_row_presentation(row: &CompareRow) -> RowPresentation {
    let winner = if row.diff > 0.0 {
        Winner::A
    } else if row.diff < 0.0 {
        Winner::B
    } else {
        Winner::Tie
    };
    // {:?} keeps the ".0" on whole-number diffs.
    let diff_text = if row.diff >= 0.0 {
        format!("+{:?}", row.diff)
    } else {
        format!("{:?}", row.diff)
    };
    RowPresentation {
        winner,
        diff_text,
        unit_suffix: if row.unit == Some(RowUnit::Percent) {
            "%"
        } else {
            ""
        },
    }
}

fn uniq_sorted<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = values.into_iter().collect();
    out.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    out.dedup();
    out
}

// =============================================================================
// Tests
// =============================================================================
