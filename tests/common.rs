//! Test utilities & fixtures.
//! The fixture catalog under `tests/fixtures/catalog` only uses probabilities
//! of 0 and 1, so action outcomes are fully predictable once the game
//! settings below remove the remaining randomness.

#![allow(dead_code)] // each test binary uses a different subset

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cobble::config::{FuelConfig, GameConfig};
use cobble::survival::{
    ActionCooldowns, Catalog, InventoryRecord, SurvivalEngine, SurvivalStore, SurvivalStoreBuilder,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

pub const PLAYER: u64 = 4242;

pub fn fixture_catalog_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("catalog")
}

pub fn shipped_catalog_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("catalog")
}

/// Game settings with fixed ranges and no risk.
pub fn fixed_game() -> GameConfig {
    GameConfig {
        explore_damage_chance: 0.0,
        mine_damage_chance: 0.0,
        damage_half_hearts: [2, 2],
        xp_per_loot_entry: [5, 5],
        tool_wear_per_loot_entry: [1, 1],
        pickaxe_priority: vec![
            "wooden_pickaxe".to_string(),
            "stone_pickaxe".to_string(),
            "iron_pickaxe".to_string(),
        ],
        fishing_rod: "fishing_rod".to_string(),
        smelting_station: "furnace".to_string(),
        admin_ids: Vec::new(),
        fuels: vec![FuelConfig {
            item: "coal".to_string(),
            smelts: 8,
        }],
        cooldowns: Default::default(),
    }
}

/// Engine over the fixture catalog with a throwaway store and no cooldowns.
pub fn engine_with(game: GameConfig) -> (TempDir, SurvivalEngine) {
    let dir = TempDir::new().expect("tempdir");
    let store = SurvivalStoreBuilder::new(dir.path()).open().expect("store");
    let catalog = Arc::new(Catalog::load(fixture_catalog_dir()).expect("fixture catalog"));
    let engine = SurvivalEngine::new(catalog, store, game)
        .expect("engine")
        .with_cooldowns(ActionCooldowns::disabled());
    (dir, engine)
}

/// Fixed engine with a started profile for `PLAYER`.
pub fn started_engine() -> (TempDir, SurvivalEngine) {
    let (dir, engine) = engine_with(fixed_game());
    engine.start_profile(PLAYER).expect("start profile");
    (dir, engine)
}

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

/// Sorted (item id, quantity, durability) view of a player's inventory.
pub fn snapshot(store: &SurvivalStore, player_id: u64) -> Vec<(String, u32, Option<u32>)> {
    let mut rows: Vec<_> = store
        .list_inventory(player_id)
        .expect("list inventory")
        .into_iter()
        .map(|r: InventoryRecord| (r.item_id, r.quantity, r.durability))
        .collect();
    rows.sort();
    rows
}
