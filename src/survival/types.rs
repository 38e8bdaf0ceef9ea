use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::survival::flags::{Achievements, Enchantments, PlayerFlags};

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const INVENTORY_SCHEMA_VERSION: u8 = 1;

/// XP needed per level. Level is always derived from total XP.
pub const XP_FACTOR: u64 = 100;
/// Maximum health points (eight hearts).
pub const MAX_HEALTH: f64 = 8.0;

// ============================================================================
// Player
// ============================================================================

/// Persistent survival profile for one chat user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    /// External chat-platform user id.
    pub id: u64,
    /// Cumulative experience. Only a death resets it.
    pub xp: u64,
    /// Current health in [0, MAX_HEALTH].
    pub health: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub achievements: Achievements,
    pub flags: PlayerFlags,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(id: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            xp: 0,
            health: MAX_HEALTH,
            created_at: now,
            updated_at: now,
            achievements: Achievements::empty(),
            flags: PlayerFlags::empty(),
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn level(&self) -> u64 {
        level_for_xp(self.xp)
    }

    /// Progress inside the current level.
    pub fn level_xp(&self) -> u64 {
        self.xp % XP_FACTOR
    }

    pub fn required_xp(&self) -> u64 {
        XP_FACTOR * self.level().max(1)
    }

    pub fn is_full_health(&self) -> bool {
        self.health >= MAX_HEALTH
    }
}

pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_FACTOR
}

// ============================================================================
// Inventory
// ============================================================================

/// One inventory row. Durability-bearing items always have `quantity == 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    pub record_id: String,
    pub player_id: u64,
    pub item_id: String,
    pub quantity: u32,
    pub durability: Option<u32>,
    pub enchantments: Enchantments,
    pub acquired_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl InventoryRecord {
    pub fn new(player_id: u64, item_id: &str, quantity: u32, durability: Option<u32>) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            player_id,
            item_id: item_id.to_string(),
            quantity,
            durability,
            enchantments: Enchantments::empty(),
            acquired_at: Utc::now(),
            schema_version: INVENTORY_SCHEMA_VERSION,
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.durability.is_none()
    }
}

// ============================================================================
// Actions and outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Explore,
    Mine,
    Fish,
    Craft,
    Smelt,
    Use,
    Discard,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Explore,
        Action::Mine,
        Action::Fish,
        Action::Craft,
        Action::Smelt,
        Action::Use,
        Action::Discard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Explore => "explore",
            Action::Mine => "mine",
            Action::Fish => "fish",
            Action::Craft => "craft",
            Action::Smelt => "smelt",
            Action::Use => "use",
            Action::Discard => "discard",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An (item, quantity, durability) tuple gained or spent by an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LootEntry {
    pub item_id: String,
    pub quantity: u32,
    pub durability: Option<u32>,
}

impl LootEntry {
    pub fn new(item_id: &str, quantity: u32, durability: Option<u32>) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
            durability,
        }
    }
}

/// Structured result of one action, handed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionOutcome {
    pub action: Option<Action>,
    pub loot: Vec<LootEntry>,
    /// Items spent: ingredients, fuel, eaten food, discarded items.
    pub consumed: Vec<LootEntry>,
    pub xp_gained: u64,
    pub leveled_up: bool,
    pub died: bool,
    /// Set only on the first death ever, so the caller can show a one-time tip.
    pub first_death: bool,
    pub damage_taken: f64,
    pub health_restored: f64,
    pub broke_item_id: Option<String>,
    pub discovered_biome_id: Option<String>,
}

impl ActionOutcome {
    pub fn for_action(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Default::default()
        }
    }
}
