//! Fixed-width bitsets for achievements, player flags and enchantments.
//!
//! Each set persists as a single integer (bincode in the store, a plain JSON
//! number in catalog files) and exposes named predicates instead of raw bit
//! tests.

use serde::{Deserialize, Serialize};

// ============================================================================
// Achievements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    /// Discover the desert biome.
    DiscoveredDesert,
    /// Discover the ocean biome.
    DiscoveredOcean,
}

impl Achievement {
    pub const ALL: [Achievement; 2] = [Achievement::DiscoveredDesert, Achievement::DiscoveredOcean];

    pub const fn bit(self) -> u64 {
        match self {
            Achievement::DiscoveredDesert => 1 << 0,
            Achievement::DiscoveredOcean => 1 << 1,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Achievement::DiscoveredDesert => "discovered_biome_desert",
            Achievement::DiscoveredOcean => "discovered_biome_ocean",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Achievements(u64);

impl Achievements {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, achievement: Achievement) -> bool {
        self.0 & achievement.bit() != 0
    }

    /// True when every bit of `required` is set. An empty requirement always holds.
    pub fn contains_all(self, required: Achievements) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn insert(&mut self, achievement: Achievement) {
        self.0 |= achievement.bit();
    }

    /// OR-merge another set into this one in place.
    pub fn merge(&mut self, other: Achievements) {
        self.0 |= other.0;
    }

    pub fn iter(self) -> impl Iterator<Item = Achievement> {
        Achievement::ALL.into_iter().filter(move |a| self.has(*a))
    }
}

impl From<Achievement> for Achievements {
    fn from(value: Achievement) -> Self {
        Self(value.bit())
    }
}

// ============================================================================
// Player flags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerFlag {
    /// The player has died at least once.
    DiedOnce,
    /// The player opted out of appearing by name on the leaderboard.
    HideOnLeaderboard,
}

impl PlayerFlag {
    pub const fn bit(self) -> u32 {
        match self {
            PlayerFlag::DiedOnce => 1 << 0,
            PlayerFlag::HideOnLeaderboard => 1 << 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerFlags(u32);

impl PlayerFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn has(self, flag: PlayerFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn set(&mut self, flag: PlayerFlag, enabled: bool) {
        if enabled {
            self.0 |= flag.bit();
        } else {
            self.0 &= !flag.bit();
        }
    }

    /// Set `flag` and report whether it was previously clear.
    pub fn set_once(&mut self, flag: PlayerFlag) -> bool {
        let first = !self.has(flag);
        self.0 |= flag.bit();
        first
    }
}

// ============================================================================
// Enchantments
// ============================================================================

const ROMAN_NUMBERS: [&str; 5] = ["I", "II", "III", "IV", "V"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enchantment {
    Unbreaking1,
    Unbreaking2,
    Unbreaking3,
}

impl Enchantment {
    pub const ALL: [Enchantment; 3] = [
        Enchantment::Unbreaking1,
        Enchantment::Unbreaking2,
        Enchantment::Unbreaking3,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Enchantment::Unbreaking1 => 1 << 0,
            Enchantment::Unbreaking2 => 1 << 1,
            Enchantment::Unbreaking3 => 1 << 2,
        }
    }

    fn family_and_level(self) -> (&'static str, u8) {
        match self {
            Enchantment::Unbreaking1 => ("Unbreaking", 1),
            Enchantment::Unbreaking2 => ("Unbreaking", 2),
            Enchantment::Unbreaking3 => ("Unbreaking", 3),
        }
    }

    pub fn display_name(self) -> String {
        let (family, level) = self.family_and_level();
        match ROMAN_NUMBERS.get(level as usize - 1) {
            Some(numeral) => format!("{} {}", family, numeral),
            None => format!("{} {}", family, level),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Enchantments(u32);

impl Enchantments {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, enchantment: Enchantment) -> bool {
        self.0 & enchantment.bit() != 0
    }

    pub fn insert(&mut self, enchantment: Enchantment) {
        self.0 |= enchantment.bit();
    }

    /// Whether every enchantment in `self` is allowed by the item's supported mask.
    pub fn supported(self, supported: Enchantments) -> bool {
        self.0 & supported.0 == self.0
    }

    /// Highest Unbreaking level present, 0 when none.
    pub fn unbreaking_level(self) -> u8 {
        if self.has(Enchantment::Unbreaking3) {
            3
        } else if self.has(Enchantment::Unbreaking2) {
            2
        } else if self.has(Enchantment::Unbreaking1) {
            1
        } else {
            0
        }
    }

    pub fn names(self) -> Vec<String> {
        Enchantment::ALL
            .into_iter()
            .filter(|e| self.has(*e))
            .map(Enchantment::display_name)
            .collect()
    }
}

impl From<Enchantment> for Enchantments {
    fn from(value: Enchantment) -> Self {
        Self(value.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requirement_is_always_met() {
        assert!(Achievements::empty().contains_all(Achievements::empty()));
        let mut owned = Achievements::empty();
        owned.insert(Achievement::DiscoveredOcean);
        assert!(owned.contains_all(Achievements::empty()));
        assert!(!owned.contains_all(Achievement::DiscoveredDesert.into()));
    }

    #[test]
    fn merge_is_or_in_place() {
        let mut owned = Achievements::from(Achievement::DiscoveredDesert);
        owned.merge(Achievement::DiscoveredOcean.into());
        assert_eq!(owned.bits(), 0b11);
        assert!(owned.has(Achievement::DiscoveredDesert));
        assert!(owned.has(Achievement::DiscoveredOcean));
        assert_eq!(owned.iter().count(), 2);
    }

    #[test]
    fn set_once_reports_first_time_only() {
        let mut flags = PlayerFlags::empty();
        assert!(flags.set_once(PlayerFlag::DiedOnce));
        assert!(!flags.set_once(PlayerFlag::DiedOnce));
        assert!(flags.has(PlayerFlag::DiedOnce));
        flags.set(PlayerFlag::HideOnLeaderboard, true);
        flags.set(PlayerFlag::HideOnLeaderboard, false);
        assert!(!flags.has(PlayerFlag::HideOnLeaderboard));
        assert!(flags.has(PlayerFlag::DiedOnce));
    }

    #[test]
    fn enchantment_names_use_roman_numerals() {
        let mut ench = Enchantments::empty();
        ench.insert(Enchantment::Unbreaking1);
        ench.insert(Enchantment::Unbreaking3);
        assert_eq!(ench.names(), vec!["Unbreaking I", "Unbreaking III"]);
        assert_eq!(ench.unbreaking_level(), 3);
    }

    #[test]
    fn enchantment_support_is_subset_check() {
        let supported = Enchantments::from_bits(0b011);
        assert!(Enchantments::from(Enchantment::Unbreaking2).supported(supported));
        assert!(!Enchantments::from(Enchantment::Unbreaking3).supported(supported));
        assert!(Enchantments::empty().supported(Enchantments::empty()));
    }

    #[test]
    fn bitsets_serialize_as_plain_integers() {
        let json = serde_json::to_string(&Achievements::from_bits(3)).unwrap();
        assert_eq!(json, "3");
        let back: Enchantments = serde_json::from_str("4").unwrap();
        assert!(back.has(Enchantment::Unbreaking3));
    }
}
