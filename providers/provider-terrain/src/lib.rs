//! # provider-terrain
//!
//! Terrain capability provider for Runewell.
//!
//! Answers script requests for deterministic column heights and biome picks
//! over a biome weight table loaded from the host's asset root. The table is
//! rebuilt wholesale on reload; readers inside world-generation callbacks
//! always see a complete snapshot.

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
pub const CAPABILITY_NAME: &str = "runewell:terrain";

/// Biome table location under the asset root.
pub const BIOME_TABLE_PATH: &str = "terrain/biomes.json";

/// Largest accepted biome weight; keeps weight sums inside `u64`.
pub const MAX_WEIGHT: u64 = 1_000_000;

/// Largest accepted height variation; keeps the height roll inside `i64`.
pub const MAX_VARIATION: u64 = 1_000_000;

/// One biome weight record.
#[derive(Debug, Clone, Deserialize)]
pub struct BiomeRecord {
    pub id: String,
    pub weight: u64,
    pub base_height: i64,
    #[serde(default)]
    pub variation: u64,
}

/// Terrain generation provider.
pub struct TerrainProvider {
    name: CapabilityName,
    biomes: DataTable<BiomeRecord>,
    source: OnceCell<PathBuf>,
}

impl Default for TerrainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainProvider {
    /// Create an uninitialized provider; the biome table loads in
    /// `initialize()`.
    pub fn new() -> Self {
        Self {
            name: CapabilityName::new(CAPABILITY_NAME).expect("static name is valid"),
            biomes: DataTable::empty(),
            source: OnceCell::new(),
        }
    }

    fn parse_record(value: &serde_json::Value) -> std::result::Result<(String, BiomeRecord), String> {
        let record: BiomeRecord = serde_json::from_value(value.clone())
            .map_err(|e| format!("biome record {value}: {e}"))?;
        if record.weight == 0 || record.weight > MAX_WEIGHT {
            return Err(format!(
                "biome record '{}': weight must be in 1..={MAX_WEIGHT}",
                record.id
            ));
        }
        if record.variation > MAX_VARIATION {
            return Err(format!(
                "biome record '{}': variation must be at most {MAX_VARIATION}",
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
        self.biomes
            .reload_from_json_file(path, Self::parse_record)
            .map_err(|e| CapabilityError::Reload(e.to_string()))?;
        Ok(())
    }

    /// Deterministic biome pick for a column.
    fn pick_biome(&self, x: i64, z: i64, seed: u64) -> Result<(BiomeRecord, u64)> {
        let snapshot = self.biomes.snapshot();
        if snapshot.is_empty() {
            return Err(CapabilityError::BadRequest(
                "biome table is empty".to_string(),
            ));
        }

        // Stable order: snapshot keys are a HashMap underneath.
        let mut records: Vec<&BiomeRecord> = snapshot.iter().map(|(_, r)| r).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let hash = mix(seed ^ mix(x as u64) ^ mix((z as u64).rotate_left(32)));
        let total: u64 = records.iter().map(|r| r.weight).sum();
        let mut roll = hash % total;
        for record in &records {
            if roll < record.weight {
                return Ok(((*record).clone(), hash));
            }
            roll -= record.weight;
        }
        unreachable!("roll is bounded by the weight total");
    }
}

/// Phase-one registration entry point.
pub fn register(registry: &CapabilityRegistry) -> Result<()> {
    registry.register(Arc::new(TerrainProvider::new()));
    Ok(())
}

#[async_trait]
impl Capability for TerrainProvider {
    fn name(&self) -> &CapabilityName {
        &self.name
    }

    fn description(&self) -> &str {
        "column heights and biome picks"
    }

    async fn initialize(&self, ctx: &InitContext) -> Result<()> {
        let path = ctx.assets_root.join(BIOME_TABLE_PATH);
        self.source.set(path.clone()).ok();

        // The first table load must succeed; without biomes the provider
        // cannot serve and is better marked unusable.
        self.load_table()
            .map_err(|e| CapabilityError::Initialization(format!("{}: {e}", path.display())))?;

        info!(
            "terrain provider initialized with {} biome(s)",
            self.biomes.snapshot().len()
        );
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        match self.load_table() {
            Ok(()) => Ok(()),
            Err(e) => {
                // Previous table stays published.
                error!("terrain reload failed, keeping v{}: {e}", self.biomes.version());
                Ok(())
            }
        }
    }

    async fn generate(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let x = request["x"]
            .as_i64()
            .ok_or_else(|| CapabilityError::BadRequest("missing integer 'x'".to_string()))?;
        let z = request["z"]
            .as_i64()
            .ok_or_else(|| CapabilityError::BadRequest("missing integer 'z'".to_string()))?;
        let seed = request["seed"].as_u64().unwrap_or(0);

        let (biome, hash) = self.pick_biome(x, z, seed)?;
        let height = biome
            .base_height
            .saturating_add((mix(hash) % (biome.variation + 1)) as i64);

        Ok(json!({
            "biome": biome.id,
            "height": height,
        }))
    }

    fn stats_text(&self) -> String {
        let snapshot = self.biomes.snapshot();
        format!(
            "terrain biomes v{}: {} record(s)",
            snapshot.version(),
            snapshot.len()
        )
    }

    fn has_resource(&self, name: &str) -> bool {
        self.biomes.snapshot().contains(name)
    }
}

/// splitmix64 finalizer; deterministic across runs and platforms.
fn mix(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
