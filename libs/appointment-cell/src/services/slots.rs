use std::collections::HashSet;

use chrono::{Duration, NaiveTime};

/// The clinic's bookable day: fixed-width slots covering `[open, close)`.
/// Pure and deterministic; occupancy is subtracted by the caller.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub step_minutes: u32,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            step_minutes: 30,
        }
    }
}

impl SlotGrid {
    /// Every candidate slot start, strictly increasing and duplicate-free.
    pub fn slots(&self) -> Vec<NaiveTime> {
        let mut slots = Vec::new();

        if self.step_minutes == 0 {
            return slots;
        }

        let step = Duration::minutes(self.step_minutes as i64);
        let mut current = self.open;

        while current < self.close {
            slots.push(current);

            // NaiveTime arithmetic wraps at midnight; a wrap means we ran
            // off the end of the day.
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        slots
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.slots().contains(&time)
    }

    /// The grid minus occupied starts, order preserved.
    pub fn available(&self, occupied: &HashSet<NaiveTime>) -> Vec<NaiveTime> {
        self.slots()
            .into_iter()
            .filter(|slot| !occupied.contains(slot))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_grid_has_sixteen_slots() {
        let slots = SlotGrid::default().slots();

        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().copied(), Some(t(9, 0)));
        assert_eq!(slots.last().copied(), Some(t(16, 30)));
    }

    #[test]
    fn slots_are_strictly_increasing_and_unique() {
        let slots = SlotGrid::default().slots();

        for pair in slots.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn available_subtracts_occupied_and_preserves_order() {
        let grid = SlotGrid::default();
        let occupied: HashSet<NaiveTime> = [t(10, 0), t(14, 30)].into_iter().collect();

        let available = grid.available(&occupied);

        assert_eq!(available.len(), 14);
        assert!(!available.contains(&t(10, 0)));
        assert!(!available.contains(&t(14, 30)));
        for pair in available.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn no_occupancy_returns_the_full_grid() {
        let grid = SlotGrid::default();
        assert_eq!(grid.available(&HashSet::new()), grid.slots());
    }

    #[test]
    fn contains_rejects_off_grid_times() {
        let grid = SlotGrid::default();

        assert!(grid.contains(t(9, 0)));
        assert!(grid.contains(t(16, 30)));
        assert!(!grid.contains(t(10, 15)));
        assert!(!grid.contains(t(17, 0)));
        assert!(!grid.contains(t(8, 30)));
    }

    #[test]
    fn zero_step_yields_no_slots() {
        let grid = SlotGrid {
            step_minutes: 0,
            ..SlotGrid::default()
        };
        assert!(grid.slots().is_empty());
    }
}
