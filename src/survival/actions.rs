//! Action rules: explore, mine, fish, craft, smelt, use and discard.
//!
//! Every action follows the same sequence inside the player's lock:
//!
//! 1. preconditions (profile, cooldown, tools, stock); nothing is written yet
//! 2. risk roll for dangerous actions; a death ends the action with no reward
//! 3. resource resolution (loot table roll, or recipe consumption)
//! 4. tool wear, possibly breaking the tool
//! 5. XP for the dropped loot entries
//! 6. biome discovery (explore only)
//!
//! Callers pass the random source so tests can seed it.

use log::{debug, info};
use rand::Rng;
use std::sync::Arc;

use super::catalog::{normalize_id, Catalog, Item};
use super::cooldown::ActionCooldowns;
use super::errors::SurvivalError;
use super::inventory;
use super::locks::PlayerLocks;
use super::loot;
use super::progression;
use super::storage::SurvivalStore;
use super::types::{Action, ActionOutcome, InventoryRecord, LootEntry, PlayerRecord};
use crate::config::GameConfig;
use crate::logutil::player_text;

/// Loot table rolled by `fish`.
pub const FISHING_TABLE: &str = "fishing";
/// Prefix of the loot table rolled by `mine`, followed by the pickaxe id.
pub const MINING_TABLE_PREFIX: &str = "mining_";

/// What a discard removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardTarget {
    /// That many units, most worn first.
    Quantity(u32),
    /// Everything of that item.
    All,
    /// One specific inventory record.
    Record(String),
}

/// Runs action rules against a store and an immutable catalog.
pub struct SurvivalEngine {
    catalog: Arc<Catalog>,
    store: SurvivalStore,
    config: GameConfig,
    locks: PlayerLocks,
    cooldowns: ActionCooldowns,
}

impl SurvivalEngine {
    /// Build an engine, checking that every item and table the game settings
    /// refer to exists in the catalog.
    pub fn new(
        catalog: Arc<Catalog>,
        store: SurvivalStore,
        config: GameConfig,
    ) -> Result<Self, SurvivalError> {
        config
            .validate()
            .map_err(|e| SurvivalError::invalid("game", e.to_string()))?;
        for pickaxe in &config.pickaxe_priority {
            require_setting_item(&catalog, "pickaxe_priority", pickaxe)?;
            let table = format!("{}{}", MINING_TABLE_PREFIX, pickaxe);
            if catalog.loot_table(&table).is_none() {
                return Err(SurvivalError::invalid(pickaxe, format!("missing loot table {}", table)));
            }
            require_setting_tool(&catalog, "pickaxe_priority", pickaxe)?;
        }
        require_setting_item(&catalog, "fishing_rod", &config.fishing_rod)?;
        if catalog.loot_table(FISHING_TABLE).is_none() {
            return Err(SurvivalError::invalid(
                &config.fishing_rod,
                format!("missing loot table {}", FISHING_TABLE),
            ));
        }
        require_setting_tool(&catalog, "fishing_rod", &config.fishing_rod)?;
        require_setting_item(&catalog, "smelting_station", &config.smelting_station)?;
        for fuel in &config.fuels {
            require_setting_item(&catalog, "fuels", &fuel.item)?;
        }

        let cooldowns = ActionCooldowns::new(config.cooldowns.windows(), config.admin_ids.clone());
        Ok(Self {
            catalog,
            store,
            config,
            locks: PlayerLocks::new(),
            cooldowns,
        })
    }

    /// Replace the cooldown tracker, e.g. with `ActionCooldowns::disabled()` in tests.
    pub fn with_cooldowns(mut self, cooldowns: ActionCooldowns) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &SurvivalStore {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub(crate) fn locks(&self) -> &PlayerLocks {
        &self.locks
    }

    pub(crate) fn cooldowns(&self) -> &ActionCooldowns {
        &self.cooldowns
    }

    /// Lock the player, check the cooldown, load the profile and run `rule`.
    /// The cooldown only starts when the rule succeeds.
    fn run<F>(&self, player_id: u64, action: Action, rule: F) -> Result<ActionOutcome, SurvivalError>
    where
        F: FnOnce(&mut PlayerRecord, &mut ActionOutcome) -> Result<(), SurvivalError>,
    {
        self.locks.with_player(player_id, || {
            self.cooldowns.check(player_id, action)?;
            let mut player = self
                .store
                .find_player(player_id)?
                .ok_or(SurvivalError::NoProfile)?;
            let mut outcome = ActionOutcome::for_action(action);
            rule(&mut player, &mut outcome)?;
            self.cooldowns.record(player_id, action);
            debug!(
                "player {} {}: {} loot, {} consumed, +{} xp",
                player_id,
                action,
                outcome.loot.len(),
                outcome.consumed.len(),
                outcome.xp_gained
            );
            Ok(outcome)
        })
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    /// Roll for damage. Returns true when the player died.
    fn risk<R: Rng + ?Sized>(
        &self,
        player: &mut PlayerRecord,
        chance: f64,
        outcome: &mut ActionOutcome,
        rng: &mut R,
    ) -> Result<bool, SurvivalError> {
        if rng.gen::<f64>() >= chance {
            return Ok(false);
        }
        let [lo, hi] = self.config.damage_half_hearts;
        let damage = f64::from(rng.gen_range(lo..=hi)) * 0.5;
        let loss = progression::remove_hp(&self.store, player, damage)?;
        outcome.damage_taken = damage;
        outcome.died = loss.died;
        outcome.first_death = loss.first_death;
        Ok(loss.died)
    }

    /// Wear a tool once per dropped entry. Unbreaking level `L` ignores each
    /// point of wear with probability `L / (L + 1)`.
    fn wear_tool<R: Rng + ?Sized>(
        &self,
        tool: &mut InventoryRecord,
        entries: usize,
        outcome: &mut ActionOutcome,
        rng: &mut R,
    ) -> Result<(), SurvivalError> {
        if tool.durability.is_none() {
            return Ok(());
        }
        let [lo, hi] = self.config.tool_wear_per_loot_entry;
        let unbreaking = f64::from(tool.enchantments.unbreaking_level());
        let skip_chance = unbreaking / (unbreaking + 1.0);
        let mut wear: i64 = 0;
        for _ in 0..entries {
            for _ in 0..rng.gen_range(lo..=hi) {
                if rng.gen::<f64>() >= skip_chance {
                    wear += 1;
                }
            }
        }
        if wear == 0 {
            return Ok(());
        }
        if inventory::edit_durability(&self.store, tool, -wear)? {
            outcome.broke_item_id = Some(tool.item_id.clone());
        }
        Ok(())
    }

    /// Award loot XP and persist the player.
    fn reward<R: Rng + ?Sized>(
        &self,
        player: &mut PlayerRecord,
        entries: usize,
        outcome: &mut ActionOutcome,
        rng: &mut R,
    ) -> Result<(), SurvivalError> {
        let [lo, hi] = self.config.xp_per_loot_entry;
        let xp = loot::xp_for_entries(entries, (lo, hi), rng);
        outcome.xp_gained = xp;
        outcome.leveled_up = progression::add_xp(&self.store, player, xp)?;
        Ok(())
    }

    /// The most worn record of the first owned tool, searching `tools` from the end.
    fn best_tool(
        &self,
        player_id: u64,
        tools: &[String],
    ) -> Result<Option<InventoryRecord>, SurvivalError> {
        for tool in tools.iter().rev() {
            let mut records = self.store.filter_inventory(player_id, tool)?;
            inventory::sort_most_worn_first(&mut records);
            if let Some(record) = records.into_iter().next() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn held_quantity(&self, player_id: u64, item: &Item) -> Result<u32, SurvivalError> {
        let held = self.store.item_quantity(player_id, &item.id)?;
        if held == 0 {
            return Err(SurvivalError::ItemNotOwned(item.display_name.clone()));
        }
        Ok(held)
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Explore a discovered biome: risk, biome loot, XP, then a chance to find a new biome.
    pub fn explore<R: Rng + ?Sized>(
        &self,
        player_id: u64,
        biome: &str,
        rng: &mut R,
    ) -> Result<ActionOutcome, SurvivalError> {
        let biome_id = normalize_id(biome);
        self.run(player_id, Action::Explore, |player, outcome| {
            let biome = self
                .catalog
                .biome(&biome_id)
                .ok_or_else(|| SurvivalError::UnknownBiome(player_text(&biome_id).to_string()))?;
            if !biome.discovered(player) {
                return Err(SurvivalError::BiomeNotDiscovered(biome.display_name.clone()));
            }
            let table = self.catalog.require_loot_table(&biome.loot_table_name())?;

            if self.risk(player, self.config.explore_damage_chance, outcome, rng)? {
                return Ok(());
            }

            outcome.loot = loot::resolve(&self.store, &self.catalog, player.id, table, rng)?;

            // At most one new biome per trip, checked in catalog order.
            let found = self
                .catalog
                .biomes()
                .iter()
                .filter(|b| !b.discovered(player))
                .find(|b| rng.gen::<f64>() < b.discovery_probability);
            if let Some(found) = found {
                player.achievements.merge(found.discovery_achievement);
                outcome.discovered_biome_id = Some(found.id.clone());
                info!("player {} discovered biome {}", player.id, found.id);
            }

            self.reward(player, outcome.loot.len(), outcome, rng)
        })
    }

    /// Mine with the best pickaxe the player owns.
    pub fn mine<R: Rng + ?Sized>(
        &self,
        player_id: u64,
        rng: &mut R,
    ) -> Result<ActionOutcome, SurvivalError> {
        self.run(player_id, Action::Mine, |player, outcome| {
            let mut pickaxe = self
                .best_tool(player.id, &self.config.pickaxe_priority)?
                .ok_or_else(|| SurvivalError::MissingTool(self.config.pickaxe_priority.clone()))?;
            let table = self
                .catalog
                .require_loot_table(&format!("{}{}", MINING_TABLE_PREFIX, pickaxe.item_id))?;

            if self.risk(player, self.config.mine_damage_chance, outcome, rng)? {
                return Ok(());
            }

            outcome.loot = loot::resolve(&self.store, &self.catalog, player.id, table, rng)?;
            self.wear_tool(&mut pickaxe, outcome.loot.len(), outcome, rng)?;
            self.reward(player, outcome.loot.len(), outcome, rng)
        })
    }

    /// Fish with the configured rod. Fishing carries no risk.
    pub fn fish<R: Rng + ?Sized>(
        &self,
        player_id: u64,
        rng: &mut R,
    ) -> Result<ActionOutcome, SurvivalError> {
        let rods = std::slice::from_ref(&self.config.fishing_rod);
        self.run(player_id, Action::Fish, |player, outcome| {
            let mut rod = self
                .best_tool(player.id, rods)?
                .ok_or_else(|| SurvivalError::MissingTool(rods.to_vec()))?;
            let table = self.catalog.require_loot_table(FISHING_TABLE)?;

            outcome.loot = loot::resolve(&self.store, &self.catalog, player.id, table, rng)?;
            self.wear_tool(&mut rod, outcome.loot.len(), outcome, rng)?;
            self.reward(player, outcome.loot.len(), outcome, rng)
        })
    }

    /// Craft `quantity` batches of an item. Every ingredient is checked before any is spent.
    pub fn craft<R: Rng + ?Sized>(
        &self,
        player_id: u64,
        item: &str,
        quantity: u32,
        rng: &mut R,
    ) -> Result<ActionOutcome, SurvivalError> {
        if quantity == 0 {
            return Err(SurvivalError::InvalidQuantity);
        }
        let item = self.catalog.require_item(&normalize_id(item))?;
        let recipe = item
            .crafting_recipe
            .as_ref()
            .ok_or_else(|| SurvivalError::NotCraftable(item.display_name.clone()))?;

        self.run(player_id, Action::Craft, |player, outcome| {
            let mut needed = Vec::with_capacity(recipe.len());
            for ingredient in recipe {
                let required = ingredient
                    .quantity
                    .checked_mul(quantity)
                    .ok_or(SurvivalError::InvalidQuantity)?;
                inventory::ensure_quantity(&self.store, player.id, &ingredient.item_id, required)?;
                needed.push((ingredient.item_id.as_str(), required));
            }
            let produced = item
                .crafting_quantity
                .checked_mul(quantity)
                .ok_or(SurvivalError::InvalidQuantity)?;

            for (ingredient, required) in needed {
                inventory::take_units(&self.store, player.id, ingredient, required)?;
                outcome.consumed.push(LootEntry::new(ingredient, required, None));
            }
            inventory::add(&self.store, player.id, &item.id, produced, item.durability)?;
            outcome.loot.push(LootEntry::new(&item.id, produced, item.durability));

            self.reward(player, 1, outcome, rng)
        })
    }

    /// Smelt raw items into their product at the smelting station, burning fuel.
    /// `item` may name either the raw input or the product.
    pub fn smelt<R: Rng + ?Sized>(
        &self,
        player_id: u64,
        item: &str,
        quantity: u32,
        rng: &mut R,
    ) -> Result<ActionOutcome, SurvivalError> {
        if quantity == 0 {
            return Err(SurvivalError::InvalidQuantity);
        }
        let named = self.catalog.require_item(&normalize_id(item))?;
        let (input, product) = match (&named.smelting_recipe, &named.smelting_product) {
            (Some(input), _) => (self.catalog.require_item(input)?, named),
            (None, Some(product)) => (named, self.catalog.require_item(product)?),
            (None, None) => return Err(SurvivalError::NotSmeltable(named.display_name.clone())),
        };

        self.run(player_id, Action::Smelt, |player, outcome| {
            let station = &self.config.smelting_station;
            if self.store.item_quantity(player.id, station)? == 0 {
                return Err(SurvivalError::MissingTool(vec![station.clone()]));
            }
            inventory::ensure_quantity(&self.store, player.id, &input.id, quantity)?;

            let mut fuel = None;
            for candidate in &self.config.fuels {
                let needed = quantity.div_ceil(candidate.smelts);
                let mut held = self.store.item_quantity(player.id, &candidate.item)?;
                if candidate.item == input.id {
                    held = held.saturating_sub(quantity);
                }
                if held >= needed {
                    fuel = Some((candidate.item.as_str(), needed));
                    break;
                }
            }
            let (fuel_id, fuel_needed) = fuel.ok_or_else(|| {
                SurvivalError::MissingTool(self.config.fuels.iter().map(|f| f.item.clone()).collect())
            })?;

            inventory::take_units(&self.store, player.id, &input.id, quantity)?;
            outcome.consumed.push(LootEntry::new(&input.id, quantity, None));
            inventory::take_units(&self.store, player.id, fuel_id, fuel_needed)?;
            outcome.consumed.push(LootEntry::new(fuel_id, fuel_needed, None));

            inventory::add(&self.store, player.id, &product.id, quantity, product.durability)?;
            outcome.loot.push(LootEntry::new(&product.id, quantity, product.durability));

            self.reward(player, 1, outcome, rng)
        })
    }

    /// Eat one unit of a food item.
    pub fn use_item(&self, player_id: u64, item: &str) -> Result<ActionOutcome, SurvivalError> {
        let item = self.catalog.require_item(&normalize_id(item))?;
        let hp = item
            .food_hp_restored
            .ok_or_else(|| SurvivalError::NotUsable(item.display_name.clone()))?;

        self.run(player_id, Action::Use, |player, outcome| {
            self.held_quantity(player.id, item)?;
            if player.is_full_health() {
                return Err(SurvivalError::FullHealth);
            }
            inventory::take_units(&self.store, player.id, &item.id, 1)?;
            outcome.consumed.push(LootEntry::new(&item.id, 1, None));
            outcome.health_restored = progression::add_hp(&self.store, player, hp)?;
            Ok(())
        })
    }

    /// Throw items away. Durability items go lowest durability first unless a
    /// record is named.
    pub fn discard(
        &self,
        player_id: u64,
        item: &str,
        target: DiscardTarget,
    ) -> Result<ActionOutcome, SurvivalError> {
        if target == DiscardTarget::Quantity(0) {
            return Err(SurvivalError::InvalidQuantity);
        }
        let item = self.catalog.require_item(&normalize_id(item))?;

        self.run(player_id, Action::Discard, |player, outcome| {
            let held = self.held_quantity(player.id, item)?;
            match &target {
                DiscardTarget::Record(record_id) => {
                    let mut record = self
                        .store
                        .get_inventory_item(player.id, record_id)?
                        .filter(|r| r.item_id == item.id)
                        .ok_or_else(|| SurvivalError::ItemNotOwned(player_text(record_id).to_string()))?;
                    let units = record.quantity;
                    inventory::remove(&self.store, &mut record, units)?;
                    outcome
                        .consumed
                        .push(LootEntry::new(&item.id, units, record.durability));
                }
                DiscardTarget::Quantity(units) => {
                    inventory::ensure_quantity(&self.store, player.id, &item.id, *units)?;
                    inventory::take_units(&self.store, player.id, &item.id, *units)?;
                    outcome.consumed.push(LootEntry::new(&item.id, *units, None));
                }
                DiscardTarget::All => {
                    inventory::take_units(&self.store, player.id, &item.id, held)?;
                    outcome.consumed.push(LootEntry::new(&item.id, held, None));
                }
            }
            info!("player {} discarded {}", player.id, item.id);
            Ok(())
        })
    }
}

fn require_setting_item(catalog: &Catalog, setting: &str, id: &str) -> Result<(), SurvivalError> {
    if catalog.item(id).is_none() {
        return Err(SurvivalError::invalid(
            format!("game.{}", setting),
            format!("unknown item {}", id),
        ));
    }
    Ok(())
}

/// Tools are worn on use, so they must carry durability.
fn require_setting_tool(catalog: &Catalog, setting: &str, id: &str) -> Result<(), SurvivalError> {
    match catalog.item(id) {
        Some(item) if item.has_durability() => Ok(()),
        _ => Err(SurvivalError::invalid(
            format!("game.{}", setting),
            format!("{} has no durability and cannot be used as a tool", id),
        )),
    }
}
