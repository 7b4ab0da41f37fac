use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod http;

/// Raw collection payload for one character: the bonus display strings plus
/// the untyped tier objects, decoded later by `collection::decode_tiers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionDetails {
    pub values: Vec<String>,
    pub data: Vec<Value>,
}

/// Seam between the pipeline and the armory API. Builders take a shared
/// implementation so tests can script responses without sockets.
#[async_trait]
pub trait ArmoryApi: Send + Sync {
    /// Resolve a character name to the numeric idx the API keys on.
    /// `None` means the name is unknown upstream, which is not an error.
    async fn fetch_character_idx(&self, name: &str) -> Result<Option<i64>>;

    /// Collection detail for a resolved idx. Missing payload keys come back
    /// as empty collections rather than failing.
    async fn fetch_collection_details(&self, character_idx: i64) -> Result<CollectionDetails>;
}
