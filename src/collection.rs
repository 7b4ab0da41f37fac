//! Typed decode of the armory collection payload.
//!
//! The upstream API is inconsistent: numbers arrive as numbers or strings,
//! applied-reward flags as bools, ints or words, and required materials in
//! two different shapes. All of that leniency lives here, so everything past
//! this module works with plain typed records.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: String,
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub name: String,
    pub progress: i64,
    pub rewards: Vec<RewardSource>,
    pub materials: Vec<MaterialNeed>,
}

/// Reward as delivered by the API. `applied` is `Some` only when the key was
/// present, holding its truthiness.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardSource {
    pub description: String,
    pub applied: Option<bool>,
}

/// One outstanding material requirement. Only shortfalls survive decoding;
/// a material already at or over its max never appears.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialNeed {
    pub name: String,
    pub needed: i64,
    /// Mission the material belongs to, when it came from the mission shape.
    pub mission: Option<String>,
    pub current: i64,
    pub max: i64,
}

/// Decode the tier list. A tier that is not an object with a `collections`
/// array is skipped, as is any collection that is not an object; one bad
/// element never fails the payload.
pub fn decode_tiers(data: &[Value]) -> Vec<Tier> {
    data.iter()
        .filter_map(|tier| {
            let collections = tier.get("collections")?.as_array()?;
            Some(Tier {
                name: coerce_string(tier.get("name")),
                collections: collections.iter().filter_map(decode_collection).collect(),
            })
        })
        .collect()
}

fn decode_collection(value: &Value) -> Option<Collection> {
    value.as_object()?;
    let rewards = value
        .get("rewards")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(decode_reward).collect())
        .unwrap_or_default();
    Some(Collection {
        name: coerce_string(value.get("name")),
        progress: coerce_i64(value.get("progress")),
        rewards,
        materials: decode_materials(value),
    })
}

fn decode_reward(value: &Value) -> RewardSource {
    RewardSource {
        description: coerce_string(value.get("description")),
        applied: value.get("applied").map(truthy),
    }
}

/// Materials come in two shapes: a flat `data` array on the collection, or
/// nested under `missions[].data` with the mission name (or title) attached.
fn decode_materials(collection: &Value) -> Vec<MaterialNeed> {
    let mut materials = Vec::new();
    if let Some(items) = collection.get("data").and_then(Value::as_array) {
        for item in items {
            push_material(&mut materials, item, None);
        }
    }
    if let Some(missions) = collection.get("missions").and_then(Value::as_array) {
        for mission in missions {
            let mission_name = mission
                .get("name")
                .filter(|v| !v.is_null())
                .or_else(|| mission.get("title").filter(|v| !v.is_null()))
                .map(|v| coerce_string(Some(v)));
            if let Some(items) = mission.get("data").and_then(Value::as_array) {
                for item in items {
                    push_material(&mut materials, item, mission_name.as_deref());
                }
            }
        }
    }
    materials
}

fn push_material(out: &mut Vec<MaterialNeed>, item: &Value, mission: Option<&str>) {
    let current = coerce_i64(item.get("progress"));
    let max = coerce_i64(item.get("max"));
    let needed = max - current;
    if needed > 0 {
        out.push(MaterialNeed {
            name: coerce_string(item.get("name")),
            needed,
            mission: mission.map(str::to_string),
            current,
            max,
        });
    }
}

/// Number or numeric-prefixed string to i64; anything else is 0. Floats
/// truncate toward zero, strings parse their leading integer ("85%" is 85).
pub(crate) fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => leading_int(s),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let t = s.trim();
    let mut token = String::new();
    let mut chars = t.chars().peekable();
    if let Some(&c) = chars.peek() {
        if c == '+' || c == '-' {
            token.push(c);
            chars.next();
        }
    }
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        token.push(c);
        chars.next();
    }
    token.parse().unwrap_or(0)
}

/// Display form of a scalar: strings pass through, null and absence become
/// empty, everything else renders the way JSON prints it.
pub(crate) fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Permissive applied-flag truthiness: boolean true, the number 1, or the
/// words "true"/"yes"/"y" in any case. The string "1" is not truthy.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Value::String(s) => {
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("y")
        }
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_i64_variants() {
        assert_eq!(coerce_i64(Some(&json!(85))), 85);
        assert_eq!(coerce_i64(Some(&json!(85.9))), 85);
        assert_eq!(coerce_i64(Some(&json!(-2.5))), -2);
        assert_eq!(coerce_i64(Some(&json!("85"))), 85);
        assert_eq!(coerce_i64(Some(&json!("85%"))), 85);
        assert_eq!(coerce_i64(Some(&json!(" -3 itens"))), -3);
        assert_eq!(coerce_i64(Some(&json!("abc"))), 0);
        assert_eq!(coerce_i64(Some(&json!(null))), 0);
        assert_eq!(coerce_i64(Some(&json!(true))), 0);
        assert_eq!(coerce_i64(None), 0);
    }

    #[test]
    fn test_coerce_string_variants() {
        assert_eq!(coerce_string(Some(&json!("Lago"))), "Lago");
        assert_eq!(coerce_string(Some(&json!(42))), "42");
        assert_eq!(coerce_string(Some(&json!(true))), "true");
        assert_eq!(coerce_string(Some(&json!(null))), "");
        assert_eq!(coerce_string(None), "");
    }

    #[test]
    fn test_truthy_accepted_forms() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!(1.0)));
        assert!(truthy(&json!("true")));
        assert!(truthy(&json!("TRUE")));
        assert!(truthy(&json!("yes")));
        assert!(truthy(&json!("Y")));
    }

    #[test]
    fn test_truthy_rejected_forms() {
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(2)));
        assert!(!truthy(&json!("false")));
        // Only the number 1 counts, not its string form.
        assert!(!truthy(&json!("1")));
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!([1])));
    }

    #[test]
    fn test_decode_skips_malformed_tiers() {
        let data = vec![
            json!("not a tier"),
            json!({"name": "No collections"}),
            json!({"name": "Tier 1", "collections": [{"name": "Lago", "progress": 10}]}),
            json!({"name": "Bad collections", "collections": "nope"}),
        ];
        let tiers = decode_tiers(&data);
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].name, "Tier 1");
        assert_eq!(tiers[0].collections.len(), 1);
        assert_eq!(tiers[0].collections[0].progress, 10);
    }

    #[test]
    fn test_decode_skips_non_object_collections() {
        let data = vec![json!({
            "name": "Tier 1",
            "collections": [42, {"name": "Lago", "progress": "33"}],
        })];
        let tiers = decode_tiers(&data);
        assert_eq!(tiers[0].collections.len(), 1);
        assert_eq!(tiers[0].collections[0].name, "Lago");
        assert_eq!(tiers[0].collections[0].progress, 33);
    }

    #[test]
    fn test_decode_rewards_applied_presence() {
        let data = vec![json!({
            "name": "T",
            "collections": [{
                "name": "C",
                "progress": 0,
                "rewards": [
                    {"description": "HP +100", "applied": true},
                    {"description": "INT +3", "applied": null},
                    {"description": "Crit 5%"},
                ],
            }],
        })];
        let rewards = &decode_tiers(&data)[0].collections[0].rewards;
        assert_eq!(rewards[0].applied, Some(true));
        assert_eq!(rewards[1].applied, Some(false));
        assert_eq!(rewards[2].applied, None);
    }

    #[test]
    fn test_decode_materials_flat_shape() {
        let data = vec![json!({
            "name": "T",
            "collections": [{
                "name": "C",
                "progress": 5,
                "data": [
                    {"name": "Ticket Especial", "progress": 1, "max": 4},
                    {"name": "Completo", "progress": 3, "max": 3},
                    {"name": "Passou", "progress": 9, "max": 3},
                ],
            }],
        })];
        let materials = &decode_tiers(&data)[0].collections[0].materials;
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, "Ticket Especial");
        assert_eq!(materials[0].needed, 3);
        assert_eq!(materials[0].mission, None);
        assert_eq!(materials[0].current, 1);
        assert_eq!(materials[0].max, 4);
    }

    #[test]
    fn test_decode_materials_mission_shape_with_title_fallback() {
        let data = vec![json!({
            "name": "T",
            "collections": [{
                "name": "C",
                "progress": 5,
                "missions": [
                    {"name": "Caçada", "data": [{"name": "Core", "progress": 0, "max": 2}]},
                    {"title": "Pesca", "data": [{"name": "Isca", "progress": 1, "max": 2}]},
                    {"data": [{"name": "Anônimo", "progress": 0, "max": 1}]},
                ],
            }],
        })];
        let materials = &decode_tiers(&data)[0].collections[0].materials;
        assert_eq!(materials.len(), 3);
        assert_eq!(materials[0].mission.as_deref(), Some("Caçada"));
        assert_eq!(materials[1].mission.as_deref(), Some("Pesca"));
        assert_eq!(materials[2].mission, None);
    }

    #[test]
    fn test_decode_materials_both_shapes_combined() {
        let data = vec![json!({
            "name": "T",
            "collections": [{
                "name": "C",
                "progress": 5,
                "data": [{"name": "Ticket", "progress": 1, "max": 4}],
                "missions": [
                    {"name": "M", "data": [{"name": "Ticket", "progress": 0, "max": 2}]},
                ],
            }],
        })];
        let materials = &decode_tiers(&data)[0].collections[0].materials;
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].needed, 3);
        assert_eq!(materials[1].needed, 2);
    }

    #[test]
    fn test_string_progress_values_in_materials() {
        let data = vec![json!({
            "name": "T",
            "collections": [{
                "name": "C",
                "progress": 5,
                "data": [{"name": "Core", "progress": "1", "max": "4"}],
            }],
        })];
        let materials = &decode_tiers(&data)[0].collections[0].materials;
        assert_eq!(materials[0].needed, 3);
    }
}
