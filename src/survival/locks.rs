//! Per-player mutual exclusion.
//!
//! Every action is a read-modify-write over one player's records. Running it
//! inside the player's slot keeps two commands from the same user from
//! overwriting each other. Different players never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct PlayerLocks {
    slots: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl PlayerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, player_id: u64) -> Arc<Mutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(player_id).or_default().clone()
    }

    /// Run `f` while holding the player's slot.
    pub fn with_player<T>(&self, player_id: u64, f: impl FnOnce() -> T) -> T {
        let slot = self.slot(player_id);
        let result = {
            let _guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        self.release(player_id, slot);
        result
    }

    /// Drop the slot from the map once no other caller holds or waits on it.
    /// Clones and drops both happen under the map lock, so the count is stable here.
    fn release(&self, player_id: u64, slot: Arc<Mutex<()>>) {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let last = Arc::strong_count(&slot) == 2;
        drop(slot);
        if last {
            slots.remove(&player_id);
        }
    }

    pub fn tracked_players(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    #[test]
    fn same_player_runs_serially() {
        let locks = Arc::new(PlayerLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    locks.with_player(7, || {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(locks.tracked_players(), 0);
    }

    #[test]
    fn idle_slots_are_released() {
        let locks = PlayerLocks::new();
        for player in 0..100 {
            locks.with_player(player, || ());
        }
        assert_eq!(locks.tracked_players(), 0);

        locks.with_player(1, || {
            assert_eq!(locks.tracked_players(), 1);
        });
        assert_eq!(locks.tracked_players(), 0);
    }

    #[test]
    fn returns_closure_value() {
        let locks = PlayerLocks::new();
        assert_eq!(locks.with_player(1, || 41 + 1), 42);
    }
}
