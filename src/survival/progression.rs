//! XP, leveling, health and death.
//!
//! The `apply_*` methods mutate a record in memory; the free functions apply
//! the same change and persist it before returning.

use log::{info, warn};

use super::errors::SurvivalError;
use super::flags::PlayerFlag;
use super::storage::SurvivalStore;
use super::types::{level_for_xp, PlayerRecord, MAX_HEALTH};

/// Result of taking damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HpLoss {
    pub died: bool,
    /// True only for the first death on this profile.
    pub first_death: bool,
}

impl PlayerRecord {
    /// Add XP and report whether at least one level boundary was crossed.
    pub fn apply_xp(&mut self, amount: u64) -> bool {
        let old_level = level_for_xp(self.xp);
        self.xp = self.xp.saturating_add(amount);
        level_for_xp(self.xp) > old_level
    }

    /// Restore health, clamped to MAX_HEALTH. Returns the amount actually restored.
    pub fn apply_heal(&mut self, amount: f64) -> f64 {
        let before = self.health;
        self.health = (self.health + amount.max(0.0)).min(MAX_HEALTH);
        self.health - before
    }

    /// Take damage. Reaching zero wipes XP and refills health.
    pub fn apply_damage(&mut self, amount: f64) -> HpLoss {
        if self.health - amount <= 0.0 {
            self.health = MAX_HEALTH;
            self.xp = 0;
            let first_death = self.flags.set_once(PlayerFlag::DiedOnce);
            return HpLoss {
                died: true,
                first_death,
            };
        }
        self.health -= amount;
        HpLoss::default()
    }
}

/// Award XP and persist. Returns whether the player leveled up.
pub fn add_xp(
    store: &SurvivalStore,
    player: &mut PlayerRecord,
    amount: u64,
) -> Result<bool, SurvivalError> {
    let leveled_up = player.apply_xp(amount);
    store.put_player(player)?;
    if leveled_up {
        info!("player {} reached level {}", player.id, player.level());
    }
    Ok(leveled_up)
}

/// Restore health and persist. Returns the amount actually restored.
pub fn add_hp(
    store: &SurvivalStore,
    player: &mut PlayerRecord,
    amount: f64,
) -> Result<f64, SurvivalError> {
    let restored = player.apply_heal(amount);
    store.put_player(player)?;
    Ok(restored)
}

/// Apply damage and persist.
pub fn remove_hp(
    store: &SurvivalStore,
    player: &mut PlayerRecord,
    amount: f64,
) -> Result<HpLoss, SurvivalError> {
    let loss = player.apply_damage(amount);
    store.put_player(player)?;
    if loss.died {
        warn!("player {} died; progression reset", player.id);
    }
    Ok(loss)
}
