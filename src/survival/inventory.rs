/// Inventory record mutation for survival players.
///
/// Items without durability stack into a single record per (player, item).
/// Items with durability never stack: every unit is its own record with
/// quantity 1 and its own durability counter.
use log::{debug, warn};
use serde::Serialize;

use super::catalog::Catalog;
use super::errors::SurvivalError;
use super::storage::SurvivalStore;
use super::types::InventoryRecord;

/// Records shown per inventory page.
pub const INVENTORY_PAGE_SIZE: usize = 6;

// ============================================================================
// Inventory Operations
// ============================================================================

/// Add `quantity` units of `item_id` to a player's inventory.
///
/// With `durability` set, `quantity` separate records are created even if the
/// player already owns that item. Without it, the existing stack is grown or a
/// new one is created. Returns the affected records.
pub fn add(
    store: &SurvivalStore,
    player_id: u64,
    item_id: &str,
    quantity: u32,
    durability: Option<u32>,
) -> Result<Vec<InventoryRecord>, SurvivalError> {
    if quantity == 0 {
        return Err(SurvivalError::InvalidQuantity);
    }

    if let Some(durability) = durability {
        let mut created = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let record = InventoryRecord::new(player_id, item_id, 1, Some(durability));
            created.push(store.create_inventory_item(record)?);
        }
        debug!(
            "player {}: +{} {} as singleton records (durability {})",
            player_id, quantity, item_id, durability
        );
        return Ok(created);
    }

    let existing = store
        .filter_inventory(player_id, item_id)?
        .into_iter()
        .find(InventoryRecord::is_stackable);

    match existing {
        Some(mut stack) => {
            stack.quantity = stack
                .quantity
                .checked_add(quantity)
                .ok_or(SurvivalError::InvalidQuantity)?;
            store.save_inventory_item(&stack)?;
            debug!("player {}: stacked +{} {} (now {})", player_id, quantity, item_id, stack.quantity);
            Ok(vec![stack])
        }
        None => {
            let record = store.create_inventory_item(InventoryRecord::new(player_id, item_id, quantity, None))?;
            debug!("player {}: new stack of {} {}", player_id, quantity, item_id);
            Ok(vec![record])
        }
    }
}

/// Remove `quantity` units from a record. Returns true when the record was exhausted and deleted.
///
/// Callers must check stock first; asking for more than the record holds is a contract violation.
pub fn remove(
    store: &SurvivalStore,
    record: &mut InventoryRecord,
    quantity: u32,
) -> Result<bool, SurvivalError> {
    debug_assert!(
        quantity <= record.quantity,
        "remove called with more than the record holds"
    );
    if quantity >= record.quantity {
        store.delete_inventory_item(record)?;
        record.quantity = 0;
        return Ok(true);
    }
    record.quantity -= quantity;
    store.save_inventory_item(record)?;
    Ok(false)
}

/// Apply a signed durability change. Returns true when the item broke and was deleted.
/// Records without durability are left untouched.
pub fn edit_durability(
    store: &SurvivalStore,
    record: &mut InventoryRecord,
    delta: i64,
) -> Result<bool, SurvivalError> {
    let Some(current) = record.durability else {
        return Ok(false);
    };
    let updated = i64::from(current) + delta;
    if updated <= 0 {
        store.delete_inventory_item(record)?;
        record.durability = Some(0);
        warn!("player {}: {} broke", record.player_id, record.item_id);
        return Ok(true);
    }
    record.durability = Some(u32::try_from(updated).unwrap_or(u32::MAX));
    store.save_inventory_item(record)?;
    Ok(false)
}

/// Sort records so the most worn unit comes first. Stacks sort after singletons.
pub fn sort_most_worn_first(records: &mut [InventoryRecord]) {
    records.sort_by_key(|r| (r.durability.is_none(), r.durability.unwrap_or(0), r.acquired_at));
}

/// Consume exactly `units` of `item_id`, most worn records first.
///
/// Stock must already have been verified; running short midway is reported as
/// a vanished record because it can only mean a concurrent change.
pub fn take_units(
    store: &SurvivalStore,
    player_id: u64,
    item_id: &str,
    units: u32,
) -> Result<(), SurvivalError> {
    let mut records = store.filter_inventory(player_id, item_id)?;
    sort_most_worn_first(&mut records);
    let mut remaining = units;
    for record in records.iter_mut() {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(record.quantity);
        remove(store, record, take)?;
        remaining -= take;
    }
    if remaining > 0 {
        return Err(SurvivalError::RecordVanished(format!(
            "{} short by {} during consumption",
            item_id, remaining
        )));
    }
    Ok(())
}

/// Fail with `InsufficientItem` unless the player holds at least `required` units.
pub fn ensure_quantity(
    store: &SurvivalStore,
    player_id: u64,
    item_id: &str,
    required: u32,
) -> Result<u32, SurvivalError> {
    let available = store.item_quantity(player_id, item_id)?;
    if available < required {
        return Err(SurvivalError::InsufficientItem {
            item_id: item_id.to_string(),
            required,
            available,
        });
    }
    Ok(available)
}

// ============================================================================
// Inventory listing
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventoryLine {
    pub record_id: String,
    pub item_id: String,
    pub display_name: String,
    pub quantity: u32,
    pub durability: Option<u32>,
    pub max_durability: Option<u32>,
    pub enchantments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventoryPage {
    /// Zero-based page index actually returned.
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub lines: Vec<InventoryLine>,
}

/// One page of a player's inventory, ordered by acquisition time.
/// Requests past the end are clamped to the last page.
pub fn inventory_page(
    store: &SurvivalStore,
    catalog: &Catalog,
    player_id: u64,
    page: usize,
) -> Result<InventoryPage, SurvivalError> {
    let mut records = store.list_inventory(player_id)?;
    records.sort_by_key(|r| r.acquired_at);

    let total_records = records.len();
    let total_pages = total_records.div_ceil(INVENTORY_PAGE_SIZE).max(1);
    let page = page.min(total_pages - 1);

    let lines = records
        .into_iter()
        .skip(page * INVENTORY_PAGE_SIZE)
        .take(INVENTORY_PAGE_SIZE)
        .map(|record| {
            let item = catalog.item(&record.item_id);
            InventoryLine {
                display_name: item
                    .map(|i| i.display_name.clone())
                    .unwrap_or_else(|| record.item_id.clone()),
                max_durability: item.and_then(|i| i.durability),
                enchantments: record.enchantments.names(),
                record_id: record.record_id,
                item_id: record.item_id,
                quantity: record.quantity,
                durability: record.durability,
            }
        })
        .collect();

    Ok(InventoryPage {
        page,
        total_pages,
        total_records,
        lines,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
