//! # provider-loot
//!
//! Loot capability provider for Runewell.
//!
//! Rolls weighted drops over named loot tables loaded from the host's asset
//! root. Table swaps are atomic; a roll in flight during a reload sees either
//! the old table or the new one, never a mix.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use runewell_capability_core::prelude::*;
use runewell_runtime::DataTable;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Canonical capability name of this provider.
pub const CAPABILITY_NAME: &str = "runewell:loot";

/// Loot table location under the asset root.
pub const LOOT_TABLE_PATH: &str = "loot/tables.json";

/// Largest accepted entry weight; keeps per-table weight sums inside `u64`.
pub const MAX_WEIGHT: u64 = 1_000_000;

/// One drop candidate inside a loot table.
#[derive(Debug, Clone, Deserialize)]
pub struct LootEntry {
    pub item: String,
    pub weight: u64,
    #[serde(default = "default_count")]
    pub count: u64,
}

fn default_count() -> u64 {
    1
}

/// One named loot table.
#[derive(Debug, Clone, Deserialize)]
pub struct LootRecord {
    pub id: String,
    pub entries: Vec<LootEntry>,
}

/// Weighted drop provider.
pub struct LootProvider {
    name: CapabilityName,
    tables: DataTable<LootRecord>,
    source: OnceCell<PathBuf>,
}

impl Default for LootProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LootProvider {
    pub fn new() -> Self {
        Self {
            name: CapabilityName::new(CAPABILITY_NAME).expect("static name is valid"),
            tables: DataTable::empty(),
            source: OnceCell::new(),
        }
    }

    fn parse_record(value: &serde_json::Value) -> std::result::Result<(String, LootRecord), String> {
        let record: LootRecord = serde_json::from_value(value.clone())
            .map_err(|e| format!("loot record {value}: {e}"))?;
        if record.entries.is_empty() {
            return Err(format!("loot table '{}' has no entries", record.id));
        }
        if record
            .entries
            .iter()
            .any(|e| e.weight == 0 || e.weight > MAX_WEIGHT)
        {
            return Err(format!(
                "loot table '{}': entry weights must be in 1..={MAX_WEIGHT}",
                record.id
            ));
        }
        Ok((record.id.clone(), record))
    }

    fn load_table(&self) -> Result<()> {
        let path = self
            .source
            .get()
            .ok_or_else(|| CapabilityError::Reload("no table source recorded".to_string()))?;
        self.tables
            .reload_from_json_file(path, Self::parse_record)
            .map_err(|e| CapabilityError::Reload(e.to_string()))?;
        Ok(())
    }

    /// Deterministic weighted roll over one table.
    fn roll(&self, table: &str, seed: u64) -> Result<LootEntry> {
        let snapshot = self.tables.snapshot();
        let record = snapshot
            .get(table)
            .ok_or_else(|| CapabilityError::UnknownResource(table.to_string()))?;

        let total: u64 = record.entries.iter().map(|e| e.weight).sum();
        let mut roll = mix(seed) % total;
        for entry in &record.entries {
            if roll < entry.weight {
                return Ok(entry.clone());
            }
            roll -= entry.weight;
        }
        unreachable!("roll is bounded by the weight total");
    }
}

/// Phase-one registration entry point.
pub fn register(registry: &CapabilityRegistry) -> Result<()> {
    registry.register(Arc::new(LootProvider::new()));
    Ok(())
}

#[async_trait]
impl Capability for LootProvider {
    fn name(&self) -> &CapabilityName {
        &self.name
    }

    fn description(&self) -> &str {
        "weighted drop rolls over named loot tables"
    }

    async fn initialize(&self, ctx: &InitContext) -> Result<()> {
        let path = ctx.assets_root.join(LOOT_TABLE_PATH);
        self.source.set(path.clone()).ok();

        self.load_table()
            .map_err(|e| CapabilityError::Initialization(format!("{}: {e}", path.display())))?;

        info!(
            "loot provider initialized with {} table(s)",
            self.tables.snapshot().len()
        );
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        match self.load_table() {
            Ok(()) => Ok(()),
            Err(e) => {
                // Previous table stays published.
                error!("loot reload failed, keeping v{}: {e}", self.tables.version());
                Ok(())
            }
        }
    }

    async fn generate(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let table = request["table"]
            .as_str()
            .ok_or_else(|| CapabilityError::BadRequest("missing string 'table'".to_string()))?;
        let seed = request["seed"].as_u64().unwrap_or(0);

        let entry = self.roll(table, seed)?;
        Ok(json!({
            "item": entry.item,
            "count": entry.count,
        }))
    }

    fn stats_text(&self) -> String {
        let snapshot = self.tables.snapshot();
        format!(
            "loot tables v{}: {} table(s)",
            snapshot.version(),
            snapshot.len()
        )
    }

    fn has_resource(&self, name: &str) -> bool {
        self.tables.snapshot().contains(name)
    }
}

/// splitmix64 finalizer, shared convention across providers.
fn mix(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLES: &str = r#"[
        {"id": "chest_common", "entries": [
            {"item": "copper_coin", "weight": 8, "count": 12},
            {"item": "iron_ingot", "weight": 2}
        ]},
        {"id": "chest_rare", "entries": [
            {"item": "rune_shard", "weight": 1}
        ]}
    ]"#;

    async fn initialized_provider(tables_json: &str) -> (LootProvider, TempDir) {
        let temp = TempDir::new().unwrap();
        let loot_dir = temp.path().join("loot");
        std::fs::create_dir_all(&loot_dir).unwrap();
        std::fs::write(loot_dir.join("tables.json"), tables_json).unwrap();

        let provider = LootProvider::new();
        let ctx = InitContext::new(temp.path(), temp.path(), CapabilityRegistry::isolated());
        provider.initialize(&ctx).await.unwrap();
        (provider, temp)
    }

    #[tokio::test]
    async fn test_initialize_loads_tables() {
        let (provider, _temp) = initialized_provider(TABLES).await;
        assert!(provider.has_resource("chest_common"));
        assert!(provider.has_resource("chest_rare"));
        assert!(provider.stats_text().contains("2 table(s)"));
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        // Three source records, one missing its id; the other two survive.
        let json = r#"[
            {"id": "chest_common", "entries": [{"item": "copper_coin", "weight": 1}]},
            {"entries": [{"item": "orphan", "weight": 1}]},
            {"id": "chest_rare", "entries": [{"item": "rune_shard", "weight": 1}]}
        ]"#;
        let (provider, _temp) = initialized_provider(json).await;
        assert!(provider.has_resource("chest_common"));
        assert!(provider.has_resource("chest_rare"));
        assert!(provider.stats_text().contains("2 table(s)"));
    }

    #[tokio::test]
    async fn test_empty_entries_rejected() {
        let json = r#"[
            {"id": "hollow", "entries": []},
            {"id": "full", "entries": [{"item": "gem", "weight": 3}]}
        ]"#;
        let (provider, _temp) = initialized_provider(json).await;
        assert!(!provider.has_resource("hollow"));
        assert!(provider.has_resource("full"));
    }

    #[tokio::test]
    async fn test_oversized_weight_rejected_at_parse() {
        let json = r#"[
            {"id": "hoard", "entries": [{"item": "gem", "weight": 18446744073709551615}]},
            {"id": "chest", "entries": [{"item": "rope", "weight": 2}]}
        ]"#;
        let (provider, _temp) = initialized_provider(json).await;
        assert!(!provider.has_resource("hoard"));
        assert!(provider.has_resource("chest"));
    }

    #[tokio::test]
    async fn test_generate_rolls_deterministically() {
        let (provider, _temp) = initialized_provider(TABLES).await;
        let request = json!({"table": "chest_common", "seed": 7});

        let first = provider.generate(request.clone()).await.unwrap();
        let second = provider.generate(request).await.unwrap();
        assert_eq!(first, second);

        let item = first["item"].as_str().unwrap();
        assert!(["copper_coin", "iron_ingot"].contains(&item));
    }

    #[tokio::test]
    async fn test_generate_single_entry_table() {
        let (provider, _temp) = initialized_provider(TABLES).await;
        let drop = provider
            .generate(json!({"table": "chest_rare", "seed": 42}))
            .await
            .unwrap();
        assert_eq!(drop["item"], "rune_shard");
        assert_eq!(drop["count"], 1);
    }

    #[tokio::test]
    async fn test_generate_unknown_table() {
        let (provider, _temp) = initialized_provider(TABLES).await;
        let err = provider
            .generate(json!({"table": "chest_mythic", "seed": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_tables() {
        let (provider, temp) = initialized_provider(TABLES).await;
        let version = provider.tables.version();

        std::fs::write(temp.path().join("loot/tables.json"), "{not json").unwrap();
        provider.reload().await.unwrap();

        assert_eq!(provider.tables.version(), version);
        assert!(provider.has_resource("chest_common"));
    }

    #[test]
    fn test_registration() {
        let registry = CapabilityRegistry::isolated();
        register(&registry).unwrap();
        assert!(registry.has(&CapabilityName::new(CAPABILITY_NAME).unwrap()));
    }
}
