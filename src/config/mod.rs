//! # Configuration Management Module
//!
//! Typed TOML configuration for the survival engine and its CLI.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where the sled database lives
//! - [`CatalogConfig`] - where the item, biome and loot-table JSON lives
//! - [`LoggingConfig`] - log level and optional log file
//! - [`GameConfig`] - tuning knobs for action rules (risk, rewards, tools, cooldowns)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cobble::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Catalog: {}", config.catalog.dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data/survival.db"
//!
//! [catalog]
//! dir = "./data/catalog"
//!
//! [logging]
//! level = "info"
//! file = "cobble.log"
//!
//! [game]
//! explore_damage_chance = 0.15
//! mine_damage_chance = 0.2
//! damage_half_hearts = [1, 4]
//! pickaxe_priority = ["wooden_pickaxe", "stone_pickaxe", "iron_pickaxe", "diamond_pickaxe"]
//!
//! [[game.fuels]]
//! item = "coal"
//! smelts = 8
//!
//! [game.cooldowns]
//! explore = 30
//! ```
//!
//! Every `[game]` key is optional and falls back to the defaults below.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::survival::types::Action;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// A smelting fuel and how many items one unit of it smelts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelConfig {
    pub item: String,
    pub smelts: u32,
}

/// Seconds a player must wait between two successful uses of an action. Zero disables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CooldownConfig {
    pub explore: u64,
    pub mine: u64,
    pub fish: u64,
    pub craft: u64,
    pub smelt: u64,
    #[serde(rename = "use")]
    pub use_item: u64,
    pub discard: u64,
}

impl CooldownConfig {
    pub fn seconds(&self, action: Action) -> u64 {
        match action {
            Action::Explore => self.explore,
            Action::Mine => self.mine,
            Action::Fish => self.fish,
            Action::Craft => self.craft,
            Action::Smelt => self.smelt,
            Action::Use => self.use_item,
            Action::Discard => self.discard,
        }
    }

    pub fn windows(&self) -> HashMap<Action, i64> {
        Action::ALL
            .iter()
            .filter(|a| self.seconds(**a) > 0)
            .map(|a| (*a, i64::try_from(self.seconds(*a)).unwrap_or(i64::MAX)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Chance that an exploration hurts the player.
    pub explore_damage_chance: f64,
    /// Chance that a mining trip hurts the player.
    pub mine_damage_chance: f64,
    /// Damage range in half hearts, inclusive.
    pub damage_half_hearts: [u32; 2],
    /// XP range awarded per dropped loot entry, inclusive.
    pub xp_per_loot_entry: [u64; 2],
    /// Durability lost by the tool per dropped loot entry, inclusive.
    pub tool_wear_per_loot_entry: [u32; 2],
    /// Pickaxes from worst to best. Each needs a `mining_<id>` loot table.
    pub pickaxe_priority: Vec<String>,
    pub fishing_rod: String,
    /// Item that must be owned to smelt.
    pub smelting_station: String,
    /// Player ids exempt from cooldowns.
    pub admin_ids: Vec<u64>,
    /// Fuels in preference order.
    pub fuels: Vec<FuelConfig>,
    pub cooldowns: CooldownConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            explore_damage_chance: 0.15,
            mine_damage_chance: 0.2,
            damage_half_hearts: [1, 4],
            xp_per_loot_entry: [1, 3],
            tool_wear_per_loot_entry: [1, 3],
            pickaxe_priority: vec![
                "wooden_pickaxe".to_string(),
                "stone_pickaxe".to_string(),
                "iron_pickaxe".to_string(),
                "diamond_pickaxe".to_string(),
            ],
            fishing_rod: "fishing_rod".to_string(),
            smelting_station: "furnace".to_string(),
            admin_ids: Vec::new(),
            fuels: vec![
                FuelConfig {
                    item: "coal".to_string(),
                    smelts: 8,
                },
                FuelConfig {
                    item: "oak_planks".to_string(),
                    smelts: 1,
                },
            ],
            cooldowns: CooldownConfig {
                explore: 30,
                mine: 30,
                fish: 30,
                ..CooldownConfig::default()
            },
        }
    }
}

impl GameConfig {
    /// Check ranges and probabilities. Catalog cross-references are checked by the engine.
    pub fn validate(&self) -> Result<()> {
        for (name, chance) in [
            ("explore_damage_chance", self.explore_damage_chance),
            ("mine_damage_chance", self.mine_damage_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(anyhow!("game.{} must be within [0, 1], got {}", name, chance));
            }
        }
        let [lo, hi] = self.damage_half_hearts;
        if lo == 0 || lo > hi {
            return Err(anyhow!("game.damage_half_hearts must satisfy 1 <= min <= max"));
        }
        let [lo, hi] = self.xp_per_loot_entry;
        if lo > hi {
            return Err(anyhow!("game.xp_per_loot_entry must satisfy min <= max"));
        }
        let [lo, hi] = self.tool_wear_per_loot_entry;
        if lo > hi {
            return Err(anyhow!("game.tool_wear_per_loot_entry must satisfy min <= max"));
        }
        if self.pickaxe_priority.is_empty() {
            return Err(anyhow!("game.pickaxe_priority must name at least one pickaxe"));
        }
        if let Some(fuel) = self.fuels.iter().find(|f| f.smelts == 0) {
            return Err(anyhow!("fuel {} must smelt at least one item", fuel.item));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.catalog.dir.trim().is_empty() {
            return Err(anyhow!("catalog.dir must not be empty"));
        }
        self.game.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data/survival.db".to_string(),
            },
            catalog: CatalogConfig {
                dir: "./data/catalog".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("cobble.log".to_string()),
            },
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.smelting_station, "furnace");
        assert_eq!(config.game.pickaxe_priority.len(), 4);
    }

    #[test]
    fn test_cooldown_windows_skip_zero() {
        let windows = GameConfig::default().cooldowns.windows();
        assert_eq!(windows.get(&Action::Explore), Some(&30));
        assert!(!windows.contains_key(&Action::Craft));
    }

    #[test]
    fn test_out_of_range_damage_chance_rejected() {
        let mut game = GameConfig::default();
        game.mine_damage_chance = 1.5;
        assert!(game.validate().is_err());
    }

    #[test]
    fn test_zero_smelt_fuel_rejected() {
        let mut game = GameConfig::default();
        game.fuels.push(FuelConfig {
            item: "stick".into(),
            smelts: 0,
        });
        let err = game.validate().unwrap_err();
        assert!(err.to_string().contains("stick"));
    }

    #[test]
    fn test_partial_game_section_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            data_dir = "db"
            [catalog]
            dir = "catalog"
            [logging]
            level = "debug"
            [game]
            mine_damage_chance = 0.0
            [game.cooldowns]
            use = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.game.mine_damage_chance, 0.0);
        assert_eq!(config.game.fishing_rod, "fishing_rod");
        assert_eq!(config.game.cooldowns.seconds(Action::Use), 5);
        assert_eq!(config.game.cooldowns.seconds(Action::Explore), 0);
        assert!(config.logging.file.is_none());
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.game, GameConfig::default());
        assert_eq!(loaded.catalog.dir, "./data/catalog");
    }
}
