use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RosterState {
    desired: usize,
    on_duty: BTreeSet<usize>,
}

/// Desired pool size together with the station ordinals currently on duty.
///
/// Both live under one lock so a station deciding to retire and the kitchen
/// growing the pool never disagree about who is still working.
#[derive(Debug, Default)]
pub struct Roster {
    state: Mutex<RosterState>,
}

impl Roster {
    /// A roster of `size` stations numbered `1..=size`, all on duty.
    pub fn staffed(size: usize) -> Self {
        Self {
            state: Mutex::new(RosterState {
                desired: size,
                on_duty: (1..=size).collect(),
            }),
        }
    }

    pub fn desired(&self) -> usize {
        self.lock().desired
    }

    pub fn on_duty(&self) -> Vec<usize> {
        self.lock().on_duty.iter().copied().collect()
    }

    /// Take `ordinal` off duty if it is above the desired size.
    /// Returns true when the station must retire.
    pub fn should_retire(&self, ordinal: usize) -> bool {
        let mut state = self.lock();
        if ordinal > state.desired {
            state.on_duty.remove(&ordinal);
            true
        } else {
            false
        }
    }

    /// Take `ordinal` off duty after it stopped for any other reason.
    pub fn sign_off(&self, ordinal: usize) {
        self.lock().on_duty.remove(&ordinal);
    }

    /// Set a new desired size. Returns the previous size and the ordinals
    /// that need a fresh station; those are already marked on duty.
    ///
    /// Ordinals between the old and new size whose station is still on
    /// duty (draining after an earlier shrink) are kept rather than doubled.
    pub fn resize(&self, new_size: usize) -> (usize, Vec<usize>) {
        let mut state = self.lock();
        let previous = state.desired;
        state.desired = new_size;

        let mut hired = Vec::new();
        for ordinal in previous + 1..=new_size {
            if state.on_duty.insert(ordinal) {
                hired.push(ordinal);
            }
        }
        (previous, hired)
    }

    fn lock(&self) -> MutexGuard<'_, RosterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staffed_roster() {
        let roster = Roster::staffed(3);
        assert_eq!(roster.desired(), 3);
        assert_eq!(roster.on_duty(), vec![1, 2, 3]);
        assert!(!roster.should_retire(3));
    }

    #[test]
    fn grow_hires_new_ordinals() {
        let roster = Roster::staffed(2);
        let (previous, hired) = roster.resize(4);
        assert_eq!(previous, 2);
        assert_eq!(hired, vec![3, 4]);
        assert_eq!(roster.on_duty(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn shrink_retires_on_check() {
        let roster = Roster::staffed(4);
        let (previous, hired) = roster.resize(2);
        assert_eq!(previous, 4);
        assert!(hired.is_empty());
        // Still on duty until the stations notice.
        assert_eq!(roster.on_duty(), vec![1, 2, 3, 4]);

        assert!(roster.should_retire(4));
        assert!(!roster.should_retire(2));
        assert_eq!(roster.on_duty(), vec![1, 2, 3]);
    }

    #[test]
    fn regrow_keeps_draining_stations() {
        let roster = Roster::staffed(4);
        roster.resize(2);
        assert!(roster.should_retire(4));

        // Station 3 has not checked in yet, so only 4 needs a new hire.
        let (_, hired) = roster.resize(4);
        assert_eq!(hired, vec![4]);
        assert!(!roster.should_retire(3));
    }

    #[test]
    fn signed_off_stations_are_rehired() {
        let roster = Roster::staffed(2);
        roster.resize(1);
        roster.sign_off(2);
        let (_, hired) = roster.resize(2);
        assert_eq!(hired, vec![2]);
    }
}
