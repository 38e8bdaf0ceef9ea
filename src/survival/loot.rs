//! Loot-table resolution.
//!
//! Each entry is rolled independently in definition order: one uniform draw
//! in [0, 1) per entry, kept when the draw is strictly below the entry's
//! probability. Kept entries then draw a quantity (and durability, if the
//! entry defines a range) uniformly from their inclusive ranges.

use log::debug;
use rand::Rng;

use super::catalog::{Catalog, Item, LootTable};
use super::errors::SurvivalError;
use super::inventory;
use super::storage::SurvivalStore;
use super::types::LootEntry;

/// One rolled entry, before it is written to an inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLoot<'a> {
    pub item: &'a Item,
    pub quantity: u32,
    pub durability: Option<u32>,
}

impl ResolvedLoot<'_> {
    pub fn to_entry(&self) -> LootEntry {
        LootEntry::new(&self.item.id, self.quantity, self.durability)
    }
}

/// Roll a table without touching any inventory.
pub fn roll<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    table: &LootTable,
    rng: &mut R,
) -> Result<Vec<ResolvedLoot<'a>>, SurvivalError> {
    let mut loot = Vec::new();
    for entry in &table.entries {
        let sample: f64 = rng.gen();
        if sample >= entry.probability {
            continue;
        }
        let item = catalog.require_item(&entry.item_id)?;
        let quantity = rng.gen_range(entry.quantity.0..=entry.quantity.1);
        let durability = entry
            .durability
            .map(|(min, max)| rng.gen_range(min..=max));
        loot.push(ResolvedLoot {
            item,
            quantity,
            durability,
        });
    }
    debug!("rolled {} of {} entries from {}", loot.len(), table.entries.len(), table.name);
    Ok(loot)
}

/// Roll a table and add every result to the player's inventory.
pub fn resolve<R: Rng + ?Sized>(
    store: &SurvivalStore,
    catalog: &Catalog,
    player_id: u64,
    table: &LootTable,
    rng: &mut R,
) -> Result<Vec<LootEntry>, SurvivalError> {
    let rolled = roll(catalog, table, rng)?;
    let mut entries = Vec::with_capacity(rolled.len());
    for loot in &rolled {
        inventory::add(store, player_id, &loot.item.id, loot.quantity, loot.durability)?;
        entries.push(loot.to_entry());
    }
    Ok(entries)
}

/// XP for a set of loot entries: the entry count times one random draw from `range`.
/// Quantities do not matter, only how many distinct entries dropped.
pub fn xp_for_entries<R: Rng + ?Sized>(entries: usize, range: (u64, u64), rng: &mut R) -> u64 {
    if entries == 0 {
        return 0;
    }
    let per_entry = rng.gen_range(range.0..=range.1);
    (entries as u64).saturating_mul(per_entry)
}
