//! Slot clock: unix time to consensus round.

use shared_types::Slot;

/// Maps unix seconds onto fixed-length slots counted from genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClock {
    genesis_time: u64,
    slot_duration_secs: u64,
}

impl SlotClock {
    /// `slot_duration_secs` must be non-zero; the config validates it.
    pub fn new(genesis_time: u64, slot_duration_secs: u64) -> Self {
        Self {
            genesis_time,
            slot_duration_secs: slot_duration_secs.max(1),
        }
    }

    /// Slot containing `now`. Times before genesis are slot 0.
    pub fn slot_at(&self, now: u64) -> Slot {
        now.saturating_sub(self.genesis_time) / self.slot_duration_secs
    }

    /// First second of `slot`.
    pub fn slot_start(&self, slot: Slot) -> u64 {
        self.genesis_time
            .saturating_add(slot.saturating_mul(self.slot_duration_secs))
    }

    /// First second after `slot`.
    pub fn slot_end(&self, slot: Slot) -> u64 {
        self.slot_start(slot.saturating_add(1))
    }

    /// Seconds from `now` until the next slot boundary.
    pub fn secs_until_next(&self, now: u64) -> u64 {
        self.slot_end(self.slot_at(now)).saturating_sub(now)
    }

    pub fn slot_duration_secs(&self) -> u64 {
        self.slot_duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_boundaries() {
        let clock = SlotClock::new(1_000, 120);
        assert_eq!(clock.slot_at(1_000), 0);
        assert_eq!(clock.slot_at(1_119), 0);
        assert_eq!(clock.slot_at(1_120), 1);
        assert_eq!(clock.slot_start(50), 7_000);
        assert_eq!(clock.slot_end(50), 7_120);
        assert_eq!(clock.secs_until_next(7_100), 20);
    }

    #[test]
    fn test_before_genesis_is_slot_zero() {
        let clock = SlotClock::new(10_000, 120);
        assert_eq!(clock.slot_at(5), 0);
    }
}
