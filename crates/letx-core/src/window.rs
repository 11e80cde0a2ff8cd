//! # Reception Window
//!
//! Sliding window of probe receptions, one bit per probe period.
//!
//! All neighbor records of a protocol instance share one [`TimeSlot`]
//! cursor. The cursor advances once per probe period; just before a slot is
//! reused its bit is cleared in every record, so a record never holds
//! evidence older than [`WINDOW_SLOTS`] periods.
//!
//! ```text
//!  bit: 11 10  9  8  7  6  5  4  3  2  1  0
//!      [ settled ........ ][nxt][cur][ settled ]   (cursor = 2)
//! ```
//!
//! The cursor slot and the one after it are "unsettled": the current
//! period's probe may still be in flight, and the next slot has just been
//! cleared. Only the remaining `WINDOW_SLOTS - 2` slots are counted.

use std::fmt;

/// Number of probe periods covered by the window.
pub const WINDOW_SLOTS: u8 = 12;

/// Slots that contribute to the reception count.
pub const SETTLED_SLOTS: u8 = WINDOW_SLOTS - 2;

const WINDOW_MASK: u16 = (1u16 << WINDOW_SLOTS) - 1;

// ─── Time Slot Cursor ───────────────────────────────────────────────────────

/// Circular slot index in `0..WINDOW_SLOTS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimeSlot(u8);

impl TimeSlot {
    /// Slot `index`, wrapped into the window.
    pub const fn new(index: u8) -> Self {
        TimeSlot(index % WINDOW_SLOTS)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// The slot after this one, wrapping 11 → 0.
    pub const fn next(self) -> Self {
        TimeSlot((self.0 + 1) % WINDOW_SLOTS)
    }

    /// Whether `slot` is this cursor or the one right after it.
    pub fn is_unsettled(self, slot: TimeSlot) -> bool {
        slot == self || slot == self.next()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─── Reception Bitmap ───────────────────────────────────────────────────────

/// 12-bit reception bitmap. Bit `j` set means a probe arrived during slot `j`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReceptionWindow(u16);

impl ReceptionWindow {
    pub const fn empty() -> Self {
        ReceptionWindow(0)
    }

    /// Window with a single reception at `slot`.
    pub fn with_slot(slot: TimeSlot) -> Self {
        let mut w = Self::empty();
        w.mark(slot);
        w
    }

    /// Build from raw bits; bits above the window are dropped.
    pub const fn from_bits(bits: u16) -> Self {
        ReceptionWindow(bits & WINDOW_MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Record a reception in `slot`.
    pub fn mark(&mut self, slot: TimeSlot) {
        self.0 |= 1 << slot.index();
    }

    /// Forget the reception in `slot`.
    pub fn clear(&mut self, slot: TimeSlot) {
        self.0 &= !(1 << slot.index()) & WINDOW_MASK;
    }

    pub fn is_set(self, slot: TimeSlot) -> bool {
        self.0 & (1 << slot.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Receptions in the settled slots relative to `cursor`, in `0..=SETTLED_SLOTS`.
    pub fn settled_count(self, cursor: TimeSlot) -> u8 {
        (0..WINDOW_SLOTS)
            .map(TimeSlot::new)
            .filter(|&slot| !cursor.is_unsettled(slot) && self.is_set(slot))
            .count() as u8
    }
}

impl fmt::Display for ReceptionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_after_eleven() {
        assert_eq!(TimeSlot::new(10).next(), TimeSlot::new(11));
        assert_eq!(TimeSlot::new(11).next(), TimeSlot::new(0));
        assert_eq!(TimeSlot::new(12), TimeSlot::new(0));
    }

    #[test]
    fn unsettled_pair_wraps() {
        let cursor = TimeSlot::new(11);
        assert!(cursor.is_unsettled(TimeSlot::new(11)));
        assert!(cursor.is_unsettled(TimeSlot::new(0)));
        assert!(!cursor.is_unsettled(TimeSlot::new(1)));
    }

    #[test]
    fn full_window_counts_ten() {
        let w = ReceptionWindow::from_bits(0x0FFF);
        for i in 0..WINDOW_SLOTS {
            assert_eq!(w.settled_count(TimeSlot::new(i)), SETTLED_SLOTS);
        }
    }

    #[test]
    fn cursor_and_next_are_excluded() {
        let mut w = ReceptionWindow::empty();
        w.mark(TimeSlot::new(3));
        w.mark(TimeSlot::new(4));
        assert_eq!(w.settled_count(TimeSlot::new(3)), 0);
        assert_eq!(w.settled_count(TimeSlot::new(2)), 1);
        assert_eq!(w.settled_count(TimeSlot::new(5)), 2);
    }

    #[test]
    fn wrapped_next_slot_is_excluded() {
        let w = ReceptionWindow::with_slot(TimeSlot::new(0));
        assert_eq!(w.settled_count(TimeSlot::new(11)), 0);
    }

    #[test]
    fn from_bits_masks_high_bits() {
        let w = ReceptionWindow::from_bits(0xF001);
        assert_eq!(w.bits(), 0x0001);
    }

    #[test]
    fn clear_only_touches_one_slot() {
        let mut w = ReceptionWindow::from_bits(0x0FFF);
        w.clear(TimeSlot::new(5));
        assert_eq!(w.bits(), 0x0FFF & !(1 << 5));
        assert!(!w.is_set(TimeSlot::new(5)));
        assert!(w.is_set(TimeSlot::new(6)));
    }

    #[test]
    fn display_is_twelve_binary_digits() {
        let w = ReceptionWindow::from_bits(0b101);
        assert_eq!(w.to_string(), "000000000101");
    }
}
