//! # Cobble - Survival progression engine for chat games
//!
//! Cobble implements the economy behind a chat-platform survival game: players
//! explore biomes, mine, fish, craft and smelt, collecting items, experience
//! and achievements along the way.
//!
//! ## Features
//!
//! - **Typed Catalog**: Items, biomes and loot tables loaded from JSON and cross-validated at startup.
//! - **Loot Resolution**: Independent per-entry rolls with inclusive quantity and durability ranges.
//! - **Inventory Rules**: Stackable materials, single-unit durability tools, wear and breakage.
//! - **Progression**: XP and levels, health, death resets and a one-time first-death tip.
//! - **Persistence**: Sled-backed player and inventory records with schema version checks.
//! - **Safety**: Per-player locking around every action and per-action cooldowns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cobble::config::Config;
//! use cobble::survival::{Catalog, SurvivalEngine, SurvivalStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let catalog = Arc::new(Catalog::load(&config.catalog.dir)?);
//!     let store = SurvivalStore::open(&config.storage.data_dir)?;
//!     let engine = SurvivalEngine::new(catalog, store, config.game)?;
//!
//!     engine.start_profile(42)?;
//!     let outcome = engine.explore(42, "forest", &mut rand::thread_rng())?;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`survival`] - Catalog, records, loot and action rules
//! - [`config`] - Configuration management and validation
//! - [`logutil`] - Helpers for logging user-supplied text

pub mod config;
pub mod logutil;
pub mod survival;
