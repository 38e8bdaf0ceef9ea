//! Survival progression engine.
//! Typed catalog data, sled-backed player and inventory records, loot
//! resolution and the action rules that tie them together.

pub mod actions;
pub mod catalog;
pub mod cooldown;
pub mod errors;
pub mod flags;
pub mod inventory;
pub mod locks;
pub mod loot;
pub mod profile;
pub mod progression;
pub mod storage;
pub mod types;

pub use actions::{DiscardTarget, SurvivalEngine, FISHING_TABLE, MINING_TABLE_PREFIX};
pub use catalog::{
    load_biomes_from_json, load_items_from_json, load_loot_table_from_json,
    load_loot_tables_from_dir, normalize_id, Biome, Catalog, Item, ItemType, LootTable,
    LootTableItem, Rarity, RecipeIngredient,
};
pub use cooldown::ActionCooldowns;
pub use errors::{ErrorKind, SurvivalError};
pub use flags::{Achievement, Achievements, Enchantment, Enchantments, PlayerFlag, PlayerFlags};
pub use inventory::{InventoryLine, InventoryPage, INVENTORY_PAGE_SIZE};
pub use locks::PlayerLocks;
pub use profile::{
    delete_profile, item_info, leaderboard, profile_summary, set_leaderboard_hidden,
    start_profile, ItemInfo, LeaderboardEntry, LeaderboardPage, ProfileSummary,
    LEADERBOARD_PAGE_SIZE,
};
pub use progression::HpLoss;
pub use storage::{SurvivalStore, SurvivalStoreBuilder};
pub use types::*;
