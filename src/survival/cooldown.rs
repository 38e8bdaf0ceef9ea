//! Per-player action cooldowns.
//!
//! Every (player, action) pair remembers when it last succeeded. A new attempt
//! inside the configured window is rejected with the seconds left. Admin ids
//! are never limited. State lives in memory only and starts empty on restart.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::errors::SurvivalError;
use super::types::Action;

pub struct ActionCooldowns {
    /// Window per action, in seconds. Missing or zero means no cooldown.
    windows: HashMap<Action, i64>,
    admins: HashSet<u64>,
    last_success: RwLock<HashMap<(u64, Action), DateTime<Utc>>>,
}

impl ActionCooldowns {
    pub fn new(windows: HashMap<Action, i64>, admins: impl IntoIterator<Item = u64>) -> Self {
        Self {
            windows,
            admins: admins.into_iter().collect(),
            last_success: RwLock::new(HashMap::new()),
        }
    }

    /// No cooldowns at all.
    pub fn disabled() -> Self {
        Self::new(HashMap::new(), [])
    }

    pub fn is_admin(&self, player_id: u64) -> bool {
        self.admins.contains(&player_id)
    }

    pub fn window(&self, action: Action) -> i64 {
        self.windows.get(&action).copied().unwrap_or(0)
    }

    /// Fail with `Cooldown` if the player acted too recently.
    pub fn check(&self, player_id: u64, action: Action) -> Result<(), SurvivalError> {
        self.check_at(player_id, action, Utc::now())
    }

    pub fn check_at(
        &self,
        player_id: u64,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<(), SurvivalError> {
        let window = self.window(action);
        if window <= 0 || self.is_admin(player_id) {
            return Ok(());
        }
        let last = self
            .last_success
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(at) = last.get(&(player_id, action)) {
            let elapsed = now.signed_duration_since(*at);
            let window = Duration::seconds(window);
            if elapsed < window {
                let remaining = window - elapsed;
                // Round up so "0 seconds left" is never reported.
                let seconds_remaining = (remaining.num_milliseconds() + 999) / 1000;
                return Err(SurvivalError::Cooldown { seconds_remaining });
            }
        }
        Ok(())
    }

    /// Start the cooldown window for a successful action.
    pub fn record(&self, player_id: u64, action: Action) {
        self.record_at(player_id, action, Utc::now());
    }

    pub fn record_at(&self, player_id: u64, action: Action, now: DateTime<Utc>) {
        if self.window(action) <= 0 {
            return;
        }
        let mut last = self
            .last_success
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.insert((player_id, action), now);
    }

    /// Forget every tracked player, e.g. after a profile is deleted.
    pub fn clear_player(&self, player_id: u64) {
        let mut last = self
            .last_success
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.retain(|(id, _), _| *id != player_id);
    }
}

impl Default for ActionCooldowns {
    fn default() -> Self {
        Self::disabled()
    }
}
