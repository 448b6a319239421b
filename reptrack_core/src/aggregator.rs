//! The single authoritative `{left, right}` repetition count.

use serde::Serialize;

use crate::exercise::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RepCount {
    pub left: u32,
    pub right: u32,
}

impl RepCount {
    pub const fn new(left: u32, right: u32) -> Self {
        Self { left, right }
    }

    /// True once the target is met: both sides for two-sided exercises, the
    /// left slot otherwise.
    pub const fn reached(&self, target: u32, two_sided: bool) -> bool {
        if two_sided {
            self.left >= target && self.right >= target
        } else {
            self.left >= target
        }
    }

    /// Reps credited to a set: the weaker side for two-sided exercises.
    pub fn completed(&self, two_sided: bool) -> u32 {
        if two_sided {
            self.left.min(self.right)
        } else {
            self.left
        }
    }
}

/// Read/reset access to rep counts, as used by the session orchestrators.
///
/// The tracker implements this too, so a reset also rewinds its phase machines.
pub trait RepCounter {
    fn rep_count(&self) -> RepCount;
    fn reset_rep_counts(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct RepAggregator {
    counts: RepCount,
}

impl RepAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_rep_counts(&mut self) {
        self.counts = RepCount::default();
    }

    /// Overwrite one side with a phase machine's own counter.
    ///
    /// `Side::None` is the single-sided slot and maps to `left`.
    pub fn update_rep_count(&mut self, side: Side, count: u32) {
        let slot = match side {
            Side::Left | Side::None => &mut self.counts.left,
            Side::Right => &mut self.counts.right,
        };
        debug_assert!(
            count >= *slot,
            "rep count for {side:?} went backwards: {} -> {count}",
            *slot
        );
        *slot = count;
    }

    pub fn read(&self) -> RepCount {
        self.counts
    }
}

impl RepCounter for RepAggregator {
    fn rep_count(&self) -> RepCount {
        self.read()
    }

    fn reset_rep_counts(&mut self) {
        RepAggregator::reset_rep_counts(self);
    }
}
