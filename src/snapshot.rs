//! Collection snapshot assembly: progress buckets, reward unlock state and
//! outstanding-material rollups for one character.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use crate::armory::ArmoryApi;
use crate::cache::Cache;
use crate::collection::{decode_tiers, MaterialNeed, RewardSource};
use crate::logging::{log, log_cache_hit, obj, v_str, Domain, Level, TimedScope};

/// Default percent at which an in-progress collection counts as near
/// completion. Collections between the mid band and this line land in no
/// bucket at all; they are deliberately out of view.
pub const NEAR_COMPLETION_THRESHOLD: i64 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Near,
    Mid,
    Low,
    BelowOne,
}

impl Bucket {
    /// Display order: closest to completion first.
    pub const ALL: [Bucket; 4] = [Bucket::Near, Bucket::Mid, Bucket::Low, Bucket::BelowOne];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Near => "near",
            Bucket::Mid => "mid",
            Bucket::Low => "low",
            Bucket::BelowOne => "below_one",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Near => "Near completion",
            Bucket::Mid => "Mid progress",
            Bucket::Low => "Low progress",
            Bucket::BelowOne => "Below 1%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardState {
    pub description: String,
    pub unlocked: bool,
}

/// Material rollup across one group of collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialAggregate {
    pub name: String,
    pub total_needed: i64,
    pub collections_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionEntry {
    pub tier: String,
    pub name: String,
    pub progress: i64,
    pub missing: i64,
    pub rewards: Vec<RewardState>,
    pub materials: Vec<MaterialNeed>,
    pub aggregated_materials: Vec<MaterialAggregate>,
    /// Comma-joined reward descriptions, kept for filter matching.
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressBuckets {
    pub near: Vec<CollectionEntry>,
    pub mid: Vec<CollectionEntry>,
    pub low: Vec<CollectionEntry>,
    pub below_one: Vec<CollectionEntry>,
}

impl ProgressBuckets {
    pub fn get(&self, bucket: Bucket) -> &[CollectionEntry] {
        match bucket {
            Bucket::Near => &self.near,
            Bucket::Mid => &self.mid,
            Bucket::Low => &self.low,
            Bucket::BelowOne => &self.below_one,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<CollectionEntry> {
        match bucket {
            Bucket::Near => &mut self.near,
            Bucket::Mid => &mut self.mid,
            Bucket::Low => &mut self.low,
            Bucket::BelowOne => &mut self.below_one,
        }
    }

    /// Every entry in display order (near first).
    pub fn all_entries(&self) -> impl Iterator<Item = &CollectionEntry> {
        self.near
            .iter()
            .chain(&self.mid)
            .chain(&self.low)
            .chain(&self.below_one)
    }

    pub fn is_empty(&self) -> bool {
        self.all_entries().next().is_none()
    }
}

/// Per-bucket material rollups, same bucket order as `ProgressBuckets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketMaterials {
    pub near: Vec<MaterialAggregate>,
    pub mid: Vec<MaterialAggregate>,
    pub low: Vec<MaterialAggregate>,
    pub below_one: Vec<MaterialAggregate>,
}

impl BucketMaterials {
    pub fn get(&self, bucket: Bucket) -> &[MaterialAggregate] {
        match bucket {
            Bucket::Near => &self.near,
            Bucket::Mid => &self.mid,
            Bucket::Low => &self.low,
            Bucket::BelowOne => &self.below_one,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// `None` when the character name is unknown upstream.
    pub character_idx: Option<i64>,
    pub progress_data: ProgressBuckets,
    /// Rollup across all buckets, biggest shortfall first.
    pub top_materials: Vec<MaterialAggregate>,
    /// Raw tier payload, passed through for views that render it directly.
    pub collection_data: Vec<Value>,
    pub materials_by_bucket: BucketMaterials,
}

impl Snapshot {
    fn not_found() -> Self {
        Self {
            character_idx: None,
            progress_data: ProgressBuckets::default(),
            top_materials: Vec::new(),
            collection_data: Vec::new(),
            materials_by_bucket: BucketMaterials::default(),
        }
    }
}

/// Builds snapshots through an `ArmoryApi`, optionally caching whole
/// snapshots per name and locale.
pub struct SnapshotBuilder {
    client: Arc<dyn ArmoryApi>,
    cache: Option<Arc<dyn Cache<Snapshot>>>,
    near_completion_threshold: i64,
}

impl SnapshotBuilder {
    pub fn new(client: Arc<dyn ArmoryApi>) -> Self {
        Self {
            client,
            cache: None,
            near_completion_threshold: NEAR_COMPLETION_THRESHOLD,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache<Snapshot>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_near_threshold(mut self, threshold: i64) -> Self {
        self.near_completion_threshold = threshold;
        self
    }

    /// Build the snapshot for one character, or serve it from cache. The
    /// locale only scopes the cache key. Cache hits are clones, so callers
    /// may mutate the result freely.
    pub async fn call(&self, name: &str, locale: Option<&str>) -> Result<Snapshot> {
        let key = snapshot_cache_key(name, locale);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                log_cache_hit(&key);
                return Ok(hit);
            }
        }
        let snapshot = self.build(name).await?;
        if let Some(cache) = &self.cache {
            cache.put(&key, snapshot.clone());
        }
        Ok(snapshot)
    }

    async fn build(&self, name: &str) -> Result<Snapshot> {
        let _timing = TimedScope::new(Domain::Snapshot, "build", &[("name", v_str(name))]);

        let Some(idx) = self.client.fetch_character_idx(name).await? else {
            log(
                Level::Info,
                Domain::Snapshot,
                "character_not_found",
                obj(&[("name", v_str(name))]),
            );
            return Ok(Snapshot::not_found());
        };

        let details = self.client.fetch_collection_details(idx).await?;
        let progress_data = self.build_progress_data(&details.data);
        let top_materials = aggregate_materials(progress_data.all_entries());
        let materials_by_bucket = BucketMaterials {
            near: aggregate_materials(&progress_data.near),
            mid: aggregate_materials(&progress_data.mid),
            low: aggregate_materials(&progress_data.low),
            below_one: aggregate_materials(&progress_data.below_one),
        };

        log(
            Level::Debug,
            Domain::Snapshot,
            "built",
            obj(&[
                ("name", v_str(name)),
                ("character_idx", json!(idx)),
                ("near", json!(progress_data.near.len())),
                ("mid", json!(progress_data.mid.len())),
                ("low", json!(progress_data.low.len())),
                ("below_one", json!(progress_data.below_one.len())),
                ("materials", json!(top_materials.len())),
            ]),
        );

        Ok(Snapshot {
            character_idx: Some(idx),
            progress_data,
            top_materials,
            collection_data: details.data,
            materials_by_bucket,
        })
    }

    /// Walk the decoded tiers and keep only in-progress collections
    /// (0 <= progress < 100), each bucketed by percent and sorted within its
    /// bucket by descending progress.
    fn build_progress_data(&self, data: &[Value]) -> ProgressBuckets {
        let mut buckets = ProgressBuckets::default();
        for tier in decode_tiers(data) {
            for collection in tier.collections {
                let progress = collection.progress;
                if !(0..100).contains(&progress) {
                    continue;
                }
                let Some(bucket) = self.progress_bucket(progress) else {
                    continue;
                };
                let rewards = build_rewards(&collection.rewards, progress);
                let status = rewards
                    .iter()
                    .map(|r| r.description.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let aggregated_materials = aggregate_material_needs(&collection.materials);
                buckets.get_mut(bucket).push(CollectionEntry {
                    tier: tier.name.clone(),
                    name: collection.name,
                    progress,
                    missing: 100 - progress,
                    rewards,
                    materials: collection.materials,
                    aggregated_materials,
                    status,
                });
            }
        }
        for bucket in Bucket::ALL {
            buckets.get_mut(bucket).sort_by_key(|e| Reverse(e.progress));
        }
        buckets
    }

    fn progress_bucket(&self, progress: i64) -> Option<Bucket> {
        if progress < 1 {
            Some(Bucket::BelowOne)
        } else if progress <= 29 {
            Some(Bucket::Low)
        } else if progress <= 59 {
            Some(Bucket::Mid)
        } else if progress >= self.near_completion_threshold {
            Some(Bucket::Near)
        } else {
            // 60 up to the near line falls outside every bucket.
            None
        }
    }
}

fn snapshot_cache_key(name: &str, locale: Option<&str>) -> String {
    format!(
        "collection_snapshot:{}:{}",
        locale.unwrap_or(""),
        name.trim().to_lowercase()
    )
}

/// A reward is unlocked when its applied flag was truthy upstream or the
/// collection progress reached the reward's threshold; either alone is
/// enough.
fn build_rewards(sources: &[RewardSource], progress: i64) -> Vec<RewardState> {
    let total = sources.len();
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| RewardState {
            description: source.description.clone(),
            unlocked: source.applied.unwrap_or(false) || progress >= reward_threshold(total, index),
        })
        .collect()
}

/// Unlock threshold by position. The common three-reward layout uses the
/// fixed 30/60/100 steps; any other count spreads evenly across 100, rounded
/// half away from zero.
fn reward_threshold(total: usize, index: usize) -> i64 {
    if total == 3 {
        [30, 60, 100].get(index).copied().unwrap_or(100)
    } else if total > 0 {
        ((index + 1) as f64 * 100.0 / total as f64).round() as i64
    } else {
        100
    }
}

/// Rollup over every material of the given entries.
pub fn aggregate_materials<'a, I>(entries: I) -> Vec<MaterialAggregate>
where
    I: IntoIterator<Item = &'a CollectionEntry>,
{
    aggregate_material_needs(entries.into_iter().flat_map(|e| e.materials.iter()))
}

/// Group materials by name, summing shortfalls and counting contributing
/// records. Ordered by total needed desc, then count desc, then name.
pub fn aggregate_material_needs<'a, I>(materials: I) -> Vec<MaterialAggregate>
where
    I: IntoIterator<Item = &'a MaterialNeed>,
{
    let mut grouped: HashMap<String, (i64, usize)> = HashMap::new();
    for material in materials {
        let entry = grouped.entry(material.name.clone()).or_insert((0, 0));
        entry.0 += material.needed;
        entry.1 += 1;
    }
    let mut out: Vec<MaterialAggregate> = grouped
        .into_iter()
        .map(|(name, (total_needed, collections_count))| MaterialAggregate {
            name,
            total_needed,
            collections_count,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_needed
            .cmp(&a.total_needed)
            .then(b.collections_count.cmp(&a.collections_count))
            .then(a.name.cmp(&b.name))
    });
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn material(name: &str, needed: i64) -> MaterialNeed {
        MaterialNeed {
            name: name.to_string(),
            needed,
            mission: None,
            current: 0,
            max: needed,
        }
    }

    fn test_builder() -> SnapshotBuilder {
        struct Never;
        #[async_trait::async_trait]
        impl ArmoryApi for Never {
            async fn fetch_character_idx(&self, _name: &str) -> Result<Option<i64>> {
                unreachable!("bucket tests never touch the client")
            }
            async fn fetch_collection_details(
                &self,
                _character_idx: i64,
            ) -> Result<crate::armory::CollectionDetails> {
                unreachable!("bucket tests never touch the client")
            }
        }
        SnapshotBuilder::new(Arc::new(Never))
    }

    #[test]
    fn test_progress_bucket_bands() {
        let builder = test_builder();
        assert_eq!(builder.progress_bucket(0), Some(Bucket::BelowOne));
        assert_eq!(builder.progress_bucket(1), Some(Bucket::Low));
        assert_eq!(builder.progress_bucket(29), Some(Bucket::Low));
        assert_eq!(builder.progress_bucket(30), Some(Bucket::Mid));
        assert_eq!(builder.progress_bucket(59), Some(Bucket::Mid));
        assert_eq!(builder.progress_bucket(80), Some(Bucket::Near));
        assert_eq!(builder.progress_bucket(99), Some(Bucket::Near));
    }

    #[test]
    fn test_progress_bucket_gap_is_dropped() {
        let builder = test_builder();
        assert_eq!(builder.progress_bucket(60), None);
        assert_eq!(builder.progress_bucket(79), None);
    }

    #[test]
    fn test_progress_bucket_honors_custom_threshold() {
        let builder = test_builder().with_near_threshold(70);
        assert_eq!(builder.progress_bucket(70), Some(Bucket::Near));
        assert_eq!(builder.progress_bucket(69), None);
        assert_eq!(builder.progress_bucket(60), None);
    }

    #[test]
    fn test_reward_threshold_three_rewards_fixed_steps() {
        assert_eq!(reward_threshold(3, 0), 30);
        assert_eq!(reward_threshold(3, 1), 60);
        assert_eq!(reward_threshold(3, 2), 100);
    }

    #[test]
    fn test_reward_threshold_even_spread() {
        assert_eq!(reward_threshold(5, 0), 20);
        assert_eq!(reward_threshold(5, 4), 100);
        assert_eq!(reward_threshold(4, 1), 50);
        assert_eq!(reward_threshold(2, 0), 50);
        // 100/7 per step, rounded half away from zero.
        assert_eq!(reward_threshold(7, 0), 14);
        assert_eq!(reward_threshold(7, 3), 57);
    }

    #[test]
    fn test_reward_threshold_empty_list() {
        assert_eq!(reward_threshold(0, 0), 100);
    }

    #[test]
    fn test_build_rewards_unlock_union() {
        let sources = vec![
            RewardSource {
                description: "A".to_string(),
                applied: Some(true),
            },
            RewardSource {
                description: "B".to_string(),
                applied: Some(false),
            },
            RewardSource {
                description: "C".to_string(),
                applied: None,
            },
        ];
        // Progress 33 passes only the first threshold (30).
        let rewards = build_rewards(&sources, 33);
        assert!(rewards[0].unlocked);
        assert!(!rewards[1].unlocked);
        assert!(!rewards[2].unlocked);

        // Applied flag unlocks even when progress is below the threshold.
        let sources = vec![
            RewardSource {
                description: "A".to_string(),
                applied: Some(false),
            },
            RewardSource {
                description: "B".to_string(),
                applied: Some(true),
            },
            RewardSource {
                description: "C".to_string(),
                applied: None,
            },
        ];
        let rewards = build_rewards(&sources, 5);
        assert!(!rewards[0].unlocked);
        assert!(rewards[1].unlocked);
        assert!(!rewards[2].unlocked);
    }

    #[test]
    fn test_aggregate_material_needs_groups_and_sorts() {
        let materials = vec![
            material("Ticket Especial", 3),
            material("Core", 2),
            material("Ticket Especial", 2),
            material("Isca", 2),
        ];
        let aggregates = aggregate_material_needs(&materials);
        assert_eq!(aggregates[0].name, "Ticket Especial");
        assert_eq!(aggregates[0].total_needed, 5);
        assert_eq!(aggregates[0].collections_count, 2);
        // Equal totals fall back to count, then name.
        assert_eq!(aggregates[1].name, "Core");
        assert_eq!(aggregates[2].name, "Isca");
    }

    #[test]
    fn test_aggregate_tie_breaks_on_count_then_name() {
        let materials = vec![
            material("B", 2),
            material("A", 1),
            material("A", 1),
            material("C", 2),
        ];
        let aggregates = aggregate_material_needs(&materials);
        // A: total 2 over two records beats B and C at one record each.
        assert_eq!(aggregates[0].name, "A");
        assert_eq!(aggregates[1].name, "B");
        assert_eq!(aggregates[2].name, "C");
    }

    #[test]
    fn test_snapshot_cache_key_normalizes_name_and_scopes_locale() {
        assert_eq!(
            snapshot_cache_key("  Cadamantis ", Some("pt-BR")),
            "collection_snapshot:pt-BR:cadamantis"
        );
        assert_eq!(
            snapshot_cache_key("Cadamantis", None),
            "collection_snapshot::cadamantis"
        );
    }

    #[test]
    fn test_bucket_order_and_names() {
        let order: Vec<&str> = Bucket::ALL.iter().map(|b| b.as_str()).collect();
        assert_eq!(order, vec!["near", "mid", "low", "below_one"]);
    }
}
