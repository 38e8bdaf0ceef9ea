use std::path::{Path, PathBuf};

use log::debug;
use sled::IVec;

use crate::survival::errors::SurvivalError;
use crate::survival::types::{
    InventoryRecord, PlayerRecord, INVENTORY_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION,
};

const TREE_PLAYERS: &str = "survival_players";
const TREE_INVENTORY: &str = "survival_inventory";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct SurvivalStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl SurvivalStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Remove the database when the store is dropped (useful for targeted tests).
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<SurvivalStore, SurvivalError> {
        SurvivalStore::open_with_options(self.path, self.temporary)
    }
}

/// Sled-backed persistence for player profiles and inventory records.
///
/// Players live under `players:<id>`; inventory rows under
/// `inventory:<player id>:<record id>` so a prefix scan yields one player's items.
pub struct SurvivalStore {
    _db: sled::Db,
    players: sled::Tree,
    inventory: sled::Tree,
}

impl SurvivalStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SurvivalError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, temporary: bool) -> Result<Self, SurvivalError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::Config::new()
            .path(path_ref)
            .temporary(temporary)
            .open()?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let inventory = db.open_tree(TREE_INVENTORY)?;
        Ok(Self {
            _db: db,
            players,
            inventory,
        })
    }

    fn player_key(id: u64) -> Vec<u8> {
        format!("players:{:020}", id).into_bytes()
    }

    fn inventory_prefix(player_id: u64) -> Vec<u8> {
        format!("inventory:{:020}:", player_id).into_bytes()
    }

    fn inventory_key(player_id: u64, record_id: &str) -> Vec<u8> {
        format!("inventory:{:020}:{}", player_id, record_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SurvivalError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, SurvivalError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_player(record: PlayerRecord) -> Result<PlayerRecord, SurvivalError> {
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(SurvivalError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn check_inventory(record: InventoryRecord) -> Result<InventoryRecord, SurvivalError> {
        if record.schema_version != INVENTORY_SCHEMA_VERSION {
            return Err(SurvivalError::SchemaMismatch {
                entity: "inventory",
                expected: INVENTORY_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert or update a player record.
    pub fn put_player(&self, player: &mut PlayerRecord) -> Result<(), SurvivalError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        player.touch();
        let bytes = Self::serialize(&*player)?;
        self.players.insert(Self::player_key(player.id), bytes)?;
        self.players.flush()?;
        Ok(())
    }

    /// Fetch a player record, `None` when the user has no profile.
    pub fn find_player(&self, id: u64) -> Result<Option<PlayerRecord>, SurvivalError> {
        match self.players.get(Self::player_key(id))? {
            Some(bytes) => Ok(Some(Self::check_player(Self::deserialize(bytes)?)?)),
            None => Ok(None),
        }
    }

    /// Fetch a player record by id.
    pub fn get_player(&self, id: u64) -> Result<PlayerRecord, SurvivalError> {
        self.find_player(id)?
            .ok_or_else(|| SurvivalError::NotFound(format!("player: {}", id)))
    }

    pub fn player_exists(&self, id: u64) -> Result<bool, SurvivalError> {
        Ok(self.players.contains_key(Self::player_key(id))?)
    }

    /// Remove a player and every inventory record they own. Returns false if absent.
    pub fn delete_player(&self, id: u64) -> Result<bool, SurvivalError> {
        let removed = self.players.remove(Self::player_key(id))?.is_some();
        let mut batch = sled::Batch::default();
        let mut count = 0usize;
        for entry in self.inventory.scan_prefix(Self::inventory_prefix(id)) {
            let (key, _) = entry?;
            batch.remove(key);
            count += 1;
        }
        self.inventory.apply_batch(batch)?;
        self.players.flush()?;
        self.inventory.flush()?;
        debug!("Deleted player {} ({} inventory records)", id, count);
        Ok(removed)
    }

    /// All stored players, in id order.
    pub fn list_players(&self) -> Result<Vec<PlayerRecord>, SurvivalError> {
        self.players
            .scan_prefix(b"players:")
            .map(|result| {
                result
                    .map_err(SurvivalError::from)
                    .and_then(|(_key, value)| Self::deserialize(value))
                    .and_then(Self::check_player)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    /// Persist a brand-new inventory record.
    pub fn create_inventory_item(&self, record: InventoryRecord) -> Result<InventoryRecord, SurvivalError> {
        let key = Self::inventory_key(record.player_id, &record.record_id);
        let bytes = Self::serialize(&record)?;
        self.inventory.insert(key, bytes)?;
        self.inventory.flush()?;
        Ok(record)
    }

    /// Overwrite an existing inventory record. Fails if it was deleted in the meantime.
    pub fn save_inventory_item(&self, record: &InventoryRecord) -> Result<(), SurvivalError> {
        let key = Self::inventory_key(record.player_id, &record.record_id);
        if !self.inventory.contains_key(&key)? {
            return Err(SurvivalError::RecordVanished(record.record_id.clone()));
        }
        let bytes = Self::serialize(record)?;
        self.inventory.insert(key, bytes)?;
        self.inventory.flush()?;
        Ok(())
    }

    /// Delete an inventory record. Fails if it was already gone.
    pub fn delete_inventory_item(&self, record: &InventoryRecord) -> Result<(), SurvivalError> {
        let key = Self::inventory_key(record.player_id, &record.record_id);
        if self.inventory.remove(key)?.is_none() {
            return Err(SurvivalError::RecordVanished(record.record_id.clone()));
        }
        self.inventory.flush()?;
        Ok(())
    }

    pub fn get_inventory_item(
        &self,
        player_id: u64,
        record_id: &str,
    ) -> Result<Option<InventoryRecord>, SurvivalError> {
        match self.inventory.get(Self::inventory_key(player_id, record_id))? {
            Some(bytes) => Ok(Some(Self::check_inventory(Self::deserialize(bytes)?)?)),
            None => Ok(None),
        }
    }

    /// Every inventory record a player owns.
    pub fn list_inventory(&self, player_id: u64) -> Result<Vec<InventoryRecord>, SurvivalError> {
        self.inventory
            .scan_prefix(Self::inventory_prefix(player_id))
            .map(|result| {
                result
                    .map_err(SurvivalError::from)
                    .and_then(|(_key, value)| Self::deserialize(value))
                    .and_then(Self::check_inventory)
            })
            .collect()
    }

    /// Inventory records of one item id, in acquisition order.
    pub fn filter_inventory(
        &self,
        player_id: u64,
        item_id: &str,
    ) -> Result<Vec<InventoryRecord>, SurvivalError> {
        let mut records: Vec<_> = self
            .list_inventory(player_id)?
            .into_iter()
            .filter(|r| r.item_id == item_id)
            .collect();
        records.sort_by_key(|r| r.acquired_at);
        Ok(records)
    }

    /// Total units of `item_id` across all of a player's records.
    pub fn item_quantity(&self, player_id: u64, item_id: &str) -> Result<u32, SurvivalError> {
        self.filter_inventory(player_id, item_id)?
            .iter()
            .try_fold(0u32, |total, r| total.checked_add(r.quantity))
            .ok_or(SurvivalError::InvalidQuantity)
    }
}
