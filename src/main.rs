use std::env;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use armoryx::armory::http::HttpArmoryClient;
use armoryx::armory::ArmoryApi;
use armoryx::cache::{Cache, MemoryCache};
use armoryx::compare::CompareBuilder;
use armoryx::config::Config;
use armoryx::error::{classify, ErrorKind};
use armoryx::logging::{log, obj, v_str, Domain, Level};
use armoryx::present::{
    collection_refs, compare_row_presentation, compare_section_groups,
    material_collections_filter_options, materials_filter_options, materials_sections,
    progress_filter_options, progress_important_attributes,
};
use armoryx::snapshot::{Snapshot, SnapshotBuilder};

const DEFAULT_CHARACTER: &str = "Cadamantis";

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = env::args().skip(1).collect();

    log(
        Level::Info,
        Domain::System,
        "start",
        obj(&[("base_url", v_str(&cfg.base_url))]),
    );

    let outcome = match args.as_slice() {
        [] => run_snapshot(&cfg, DEFAULT_CHARACTER).await,
        [name] => run_snapshot(&cfg, name).await,
        [name_a, name_b] => run_compare(&cfg, name_a, name_b).await,
        _ => {
            eprintln!("usage: armoryx [name] | armoryx <name_a> <name_b>");
            std::process::exit(2);
        }
    };

    if let Err(err) = outcome {
        log(
            Level::Error,
            Domain::System,
            "failed",
            obj(&[("error", v_str(&err.to_string()))]),
        );
        eprintln!("{}", friendly_message(&err));
        std::process::exit(1);
    }
    Ok(())
}

async fn run_snapshot(cfg: &Config, name: &str) -> Result<()> {
    let client: Arc<dyn ArmoryApi> = Arc::new(HttpArmoryClient::new(cfg));
    let cache: Arc<dyn Cache<Snapshot>> = Arc::new(MemoryCache::with_ttl_secs(cfg.cache_ttl_secs));
    let builder = SnapshotBuilder::new(client)
        .with_cache(cache)
        .with_near_threshold(cfg.near_completion_threshold);

    let snapshot = builder.call(name, None).await?;
    if snapshot.character_idx.is_none() {
        eprintln!("character not found: {}", name);
    }

    let sections = materials_sections(&snapshot.materials_by_bucket, &snapshot.top_materials);
    let refs = collection_refs(&snapshot.progress_data);
    let view = json!({
        "name": name,
        "filter_options": progress_filter_options(&snapshot.progress_data),
        "important_attributes": progress_important_attributes(),
        "materials_sections": sections,
        "materials_filter_options": materials_filter_options(&sections),
        "collection_refs": refs,
        "collection_filter_options": material_collections_filter_options(&refs),
        "snapshot": snapshot,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn run_compare(cfg: &Config, name_a: &str, name_b: &str) -> Result<()> {
    let client: Arc<dyn ArmoryApi> = Arc::new(HttpArmoryClient::new(cfg));
    let builder = CompareBuilder::new(client);

    let payload = builder.call(name_a, name_b).await?;
    if !payload.comparison_ready {
        eprintln!("both character names are required for a comparison");
    }

    let rows: Vec<Value> = payload
        .result
        .detailed_ordered
        .iter()
        .map(|row| json!({"row": row, "presentation": compare_row_presentation(row)}))
        .collect();
    let common_groups = compare_section_groups(&payload.result.common_annotated);
    let only_a_groups = compare_section_groups(&payload.result.only_a_annotated);
    let only_b_groups = compare_section_groups(&payload.result.only_b_annotated);

    let view = json!({
        "rows": rows,
        "common_groups": common_groups,
        "only_a_groups": only_a_groups,
        "only_b_groups": only_b_groups,
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn friendly_message(err: &anyhow::Error) -> String {
    match classify(err) {
        ErrorKind::InvalidJson { detail } => {
            format!("the armory API returned malformed data: {}", detail)
        }
        ErrorKind::Message(message) => message,
        ErrorKind::Unexpected => "unexpected error while talking to the armory API".to_string(),
    }
}
