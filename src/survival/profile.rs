//! Profile lifecycle, item lookups and the global leaderboard.

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use super::actions::SurvivalEngine;
use super::catalog::{normalize_id, Catalog, ItemType, Rarity, RecipeIngredient};
use super::errors::SurvivalError;
use super::flags::PlayerFlag;
use super::inventory::{self, InventoryPage};
use super::storage::SurvivalStore;
use super::types::{PlayerRecord, MAX_HEALTH};

/// Players shown per leaderboard page.
pub const LEADERBOARD_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileSummary {
    pub player_id: u64,
    pub level: u64,
    pub level_xp: u64,
    pub required_xp: u64,
    pub xp: u64,
    pub health: f64,
    pub max_health: f64,
    pub discovered_biomes: usize,
    pub total_biomes: usize,
    pub achievements: Vec<&'static str>,
    pub hidden_on_leaderboard: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemInfo {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub rarity: Rarity,
    pub item_type: ItemType,
    pub max_durability: Option<u32>,
    pub food_hp_restored: Option<f64>,
    pub craftable: bool,
    pub crafting_recipe: Vec<RecipeIngredient>,
    pub crafting_quantity: u32,
    pub smelting_recipe: Option<String>,
    pub supported_enchantments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position across all pages.
    pub rank: usize,
    /// `None` for players who hid themselves.
    pub player_id: Option<u64>,
    pub xp: u64,
    pub level: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardPage {
    pub page: usize,
    pub total_pages: usize,
    pub entries: Vec<LeaderboardEntry>,
}

/// Create a fresh profile. Fails if one already exists.
pub fn start_profile(store: &SurvivalStore, player_id: u64) -> Result<PlayerRecord, SurvivalError> {
    if store.player_exists(player_id)? {
        return Err(SurvivalError::ProfileExists);
    }
    let mut player = PlayerRecord::new(player_id);
    store.put_player(&mut player)?;
    info!("player {} started a survival profile", player_id);
    Ok(player)
}

/// Delete a profile and its whole inventory.
pub fn delete_profile(store: &SurvivalStore, player_id: u64) -> Result<(), SurvivalError> {
    if !store.delete_player(player_id)? {
        return Err(SurvivalError::NoProfile);
    }
    info!("player {} deleted their survival profile", player_id);
    Ok(())
}

pub fn profile_summary(
    store: &SurvivalStore,
    catalog: &Catalog,
    player_id: u64,
) -> Result<ProfileSummary, SurvivalError> {
    let player = store.find_player(player_id)?.ok_or(SurvivalError::NoProfile)?;
    Ok(ProfileSummary {
        player_id,
        level: player.level(),
        level_xp: player.level_xp(),
        required_xp: player.required_xp(),
        xp: player.xp,
        health: player.health,
        max_health: MAX_HEALTH,
        discovered_biomes: catalog.discovered_biomes(&player).count(),
        total_biomes: catalog.biomes().len(),
        achievements: player.achievements.iter().map(|a| a.key()).collect(),
        hidden_on_leaderboard: player.flags.has(PlayerFlag::HideOnLeaderboard),
        created_at: player.created_at,
    })
}

/// Look up an item by free-form name ("Iron Ingot" or "iron_ingot").
pub fn item_info(catalog: &Catalog, name: &str) -> Result<ItemInfo, SurvivalError> {
    let item = catalog.require_item(&normalize_id(name))?;
    Ok(ItemInfo {
        id: item.id.clone(),
        display_name: item.display_name.clone(),
        description: item.description.clone(),
        rarity: item.rarity,
        item_type: item.item_type,
        max_durability: item.durability,
        food_hp_restored: item.food_hp_restored,
        craftable: item.is_craftable(),
        crafting_recipe: item.crafting_recipe.clone().unwrap_or_default(),
        crafting_quantity: item.crafting_quantity,
        smelting_recipe: item.smelting_recipe.clone(),
        supported_enchantments: item.supported_enchantments.names(),
    })
}

/// Players ordered by XP, highest first. Pages past the end clamp to the last page.
pub fn leaderboard(store: &SurvivalStore, page: usize) -> Result<LeaderboardPage, SurvivalError> {
    let mut players = store.list_players()?;
    players.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.id.cmp(&b.id)));

    let total_pages = players.len().div_ceil(LEADERBOARD_PAGE_SIZE).max(1);
    let page = page.min(total_pages - 1);
    let offset = page * LEADERBOARD_PAGE_SIZE;

    let entries = players
        .iter()
        .enumerate()
        .skip(offset)
        .take(LEADERBOARD_PAGE_SIZE)
        .map(|(idx, p)| LeaderboardEntry {
            rank: idx + 1,
            player_id: (!p.flags.has(PlayerFlag::HideOnLeaderboard)).then_some(p.id),
            xp: p.xp,
            level: p.level(),
        })
        .collect();

    Ok(LeaderboardPage {
        page,
        total_pages,
        entries,
    })
}

pub fn set_leaderboard_hidden(
    store: &SurvivalStore,
    player_id: u64,
    hidden: bool,
) -> Result<PlayerRecord, SurvivalError> {
    let mut player = store.find_player(player_id)?.ok_or(SurvivalError::NoProfile)?;
    player.flags.set(PlayerFlag::HideOnLeaderboard, hidden);
    store.put_player(&mut player)?;
    Ok(player)
}

// Engine entry points, serialised with actions through the player lock.
impl SurvivalEngine {
    pub fn start_profile(&self, player_id: u64) -> Result<PlayerRecord, SurvivalError> {
        self.locks()
            .with_player(player_id, || start_profile(self.store(), player_id))
    }

    pub fn delete_profile(&self, player_id: u64) -> Result<(), SurvivalError> {
        self.locks().with_player(player_id, || {
            delete_profile(self.store(), player_id)?;
            self.cooldowns().clear_player(player_id);
            Ok(())
        })
    }

    pub fn profile(&self, player_id: u64) -> Result<ProfileSummary, SurvivalError> {
        profile_summary(self.store(), self.catalog(), player_id)
    }

    pub fn set_leaderboard_hidden(&self, player_id: u64, hidden: bool) -> Result<PlayerRecord, SurvivalError> {
        self.locks()
            .with_player(player_id, || set_leaderboard_hidden(self.store(), player_id, hidden))
    }

    pub fn inventory(&self, player_id: u64, page: usize) -> Result<InventoryPage, SurvivalError> {
        if !self.store().player_exists(player_id)? {
            return Err(SurvivalError::NoProfile);
        }
        inventory::inventory_page(self.store(), self.catalog(), player_id, page)
    }

    pub fn item_info(&self, name: &str) -> Result<ItemInfo, SurvivalError> {
        item_info(self.catalog(), name)
    }

    pub fn leaderboard(&self, page: usize) -> Result<LeaderboardPage, SurvivalError> {
        leaderboard(self.store(), page)
    }

    /// Biome ids the player may explore, in catalog order.
    pub fn explorable_biomes(&self, player_id: u64) -> Result<Vec<String>, SurvivalError> {
        let player = self.store().find_player(player_id)?.ok_or(SurvivalError::NoProfile)?;
        Ok(self
            .catalog()
            .discovered_biomes(&player)
            .map(|b| b.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survival::storage::SurvivalStoreBuilder;
    use tempfile::TempDir;

    fn store() -> (TempDir, SurvivalStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = SurvivalStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    #[test]
    fn test_start_profile_twice_fails() {
        let (_dir, store) = store();
        start_profile(&store, 5).expect("start");
        assert!(matches!(start_profile(&store, 5), Err(SurvivalError::ProfileExists)));
    }

    #[test]
    fn test_delete_missing_profile_reports_no_profile() {
        let (_dir, store) = store();
        assert!(matches!(delete_profile(&store, 5), Err(SurvivalError::NoProfile)));
    }

    #[test]
    fn test_leaderboard_orders_by_xp_and_hides() {
        let (_dir, store) = store();
        for (id, xp) in [(1u64, 50u64), (2, 900), (3, 300)] {
            let mut p = PlayerRecord::new(id);
            p.xp = xp;
            store.put_player(&mut p).expect("put");
        }
        set_leaderboard_hidden(&store, 3, true).expect("hide");

        let board = leaderboard(&store, 0).expect("board");
        assert_eq!(board.total_pages, 1);
        let ranks: Vec<_> = board.entries.iter().map(|e| (e.rank, e.player_id, e.xp)).collect();
        assert_eq!(ranks, vec![(1, Some(2), 900), (2, None, 300), (3, Some(1), 50)]);
    }

    #[test]
    fn test_leaderboard_clamps_past_last_page() {
        let (_dir, store) = store();
        for id in 0..(LEADERBOARD_PAGE_SIZE as u64 + 3) {
            let mut p = PlayerRecord::new(id);
            p.xp = id * 10;
            store.put_player(&mut p).expect("put");
        }
        let board = leaderboard(&store, 9).expect("board");
        assert_eq!(board.page, 1);
        assert_eq!(board.entries.len(), 3);
        assert_eq!(board.entries[0].rank, LEADERBOARD_PAGE_SIZE + 1);
    }
}
