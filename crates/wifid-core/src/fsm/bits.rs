// ── Action bitsets ──
//
// Fixed-width bitset plus the pending / in-flight pair every committable
// entity owns. Marks landing while a commit runs accumulate in a fresh
// `pending` set and are picked up by the next commit.

use std::fmt;

const WORDS: usize = 2;
const WORD_BITS: usize = u64::BITS as usize;

/// 128-bit set of attribute indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FsmBitSet {
    words: [u64; WORDS],
}

impl FsmBitSet {
    pub const CAPACITY: usize = WORDS * WORD_BITS;

    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Set `bit`. Indices beyond [`Self::CAPACITY`] are ignored.
    pub fn mark(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
            *word |= 1 << (bit % WORD_BITS);
        }
    }

    pub fn clear(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
            *word &= !(1 << (bit % WORD_BITS));
        }
    }

    pub fn test(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD_BITS)
            .is_some_and(|word| word & (1 << (bit % WORD_BITS)) != 0)
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }

    /// Any bit at index `threshold` or above is set.
    pub fn any_from(&self, threshold: usize) -> bool {
        self.iter().any(|bit| bit >= threshold)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn union_with(&mut self, other: &Self) {
        for (word, theirs) in self.words.iter_mut().zip(other.words) {
            *word |= theirs;
        }
    }

    /// Move every bit out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(|bit| self.test(*bit))
    }
}

impl FromIterator<usize> for FsmBitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for bit in iter {
            set.mark(bit);
        }
        set
    }
}

impl fmt::Debug for FsmBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ── Commit snapshot ──────────────────────────────────────────────────

/// Bits handed to the driver for one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitBits {
    pub bits: FsmBitSet,
    pub sync_all: bool,
}

impl CommitBits {
    pub fn is_empty(&self) -> bool {
        !self.sync_all && !self.bits.any()
    }
}

// ── BitActionSet ─────────────────────────────────────────────────────

/// Edits not yet applied plus the snapshot of the commit in progress.
#[derive(Debug, Clone, Default)]
pub struct BitActionSet {
    pending: FsmBitSet,
    in_flight: FsmBitSet,
    sync_all: bool,
    in_flight_sync_all: bool,
    committing: bool,
}

impl BitActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change. Returns `true` when this mark takes the set from
    /// nothing pending to something pending.
    pub fn mark(&mut self, bit: usize) -> bool {
        let was_pending = self.has_any_pending();
        self.pending.mark(bit);
        !was_pending && self.has_any_pending()
    }

    /// Request a full resync on the next commit, whatever the bits say.
    pub fn mark_sync_all(&mut self) -> bool {
        let was_pending = self.has_any_pending();
        self.sync_all = true;
        !was_pending
    }

    pub fn has_any_pending(&self) -> bool {
        self.sync_all || self.pending.any()
    }

    /// Pending bits at or above `threshold`, or a forced resync.
    pub fn has_significant_pending(&self, threshold: usize) -> bool {
        self.sync_all || self.pending.any_from(threshold)
    }

    pub fn pending(&self) -> FsmBitSet {
        self.pending
    }

    pub fn in_flight(&self) -> FsmBitSet {
        self.in_flight
    }

    /// A commit has started and the driver has not confirmed it yet.
    pub fn is_committing(&self) -> bool {
        self.committing
    }

    /// Move `pending` into `in_flight` and return the snapshot.
    pub fn begin_commit(&mut self) -> CommitBits {
        self.in_flight.union_with(&self.pending.take());
        self.in_flight_sync_all |= std::mem::take(&mut self.sync_all);
        self.committing = true;
        CommitBits {
            bits: self.in_flight,
            sync_all: self.in_flight_sync_all,
        }
    }

    /// Driver confirmed the commit.
    pub fn end_commit(&mut self) {
        self.in_flight = FsmBitSet::new();
        self.in_flight_sync_all = false;
        self.committing = false;
    }

    /// Commit failed; fold its bits back into `pending` so the next
    /// commit carries them again.
    pub fn abort_commit(&mut self) {
        self.pending.union_with(&self.in_flight.take());
        self.sync_all |= std::mem::take(&mut self.in_flight_sync_all);
        self.committing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_test_clear() {
        let mut set = FsmBitSet::new();
        set.mark(3);
        set.mark(70);
        assert!(set.test(3));
        assert!(set.test(70));
        assert_eq!(set.count(), 2);
        set.clear(3);
        assert!(!set.test(3));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![70]);
    }

    #[test]
    fn out_of_range_bits_are_ignored() {
        let mut set = FsmBitSet::new();
        set.mark(FsmBitSet::CAPACITY);
        assert!(!set.any());
        assert!(!set.test(FsmBitSet::CAPACITY + 5));
    }

    #[test]
    fn any_from_threshold() {
        let set: FsmBitSet = [1, 2].into_iter().collect();
        assert!(set.any_from(0));
        assert!(set.any_from(2));
        assert!(!set.any_from(3));
    }

    #[test]
    fn mark_reports_first_pending_transition() {
        let mut actions = BitActionSet::new();
        assert!(actions.mark(1));
        assert!(!actions.mark(2));
        assert!(!actions.mark(1));
    }

    #[test]
    fn begin_commit_moves_pending() {
        let mut actions = BitActionSet::new();
        actions.mark(1);
        actions.mark(4);

        let snapshot = actions.begin_commit();

        assert_eq!(snapshot.bits.iter().collect::<Vec<_>>(), vec![1, 4]);
        assert!(!actions.has_any_pending());
        assert!(actions.is_committing());
    }

    #[test]
    fn marks_during_commit_accumulate_separately() {
        let mut actions = BitActionSet::new();
        actions.mark(1);
        actions.begin_commit();

        assert!(actions.mark(2));
        actions.end_commit();

        assert_eq!(actions.pending().iter().collect::<Vec<_>>(), vec![2]);
        assert!(!actions.in_flight().any());
        assert!(!actions.is_committing());
    }

    #[test]
    fn coalescing_across_two_commits() {
        let mut actions = BitActionSet::new();
        for bit in [1, 2, 1, 3] {
            actions.mark(bit);
        }
        let first = actions.begin_commit();
        actions.end_commit();
        for bit in [3, 5, 5, 7] {
            actions.mark(bit);
        }
        let second = actions.begin_commit();

        assert_eq!(first.bits.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(second.bits.iter().collect::<Vec<_>>(), vec![3, 5, 7]);
    }

    #[test]
    fn abort_returns_bits_to_pending() {
        let mut actions = BitActionSet::new();
        actions.mark(1);
        actions.mark_sync_all();
        actions.begin_commit();
        actions.mark(2);

        actions.abort_commit();

        assert_eq!(actions.pending().iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(actions.has_significant_pending(100));
        assert!(!actions.is_committing());
    }

    #[test]
    fn sync_all_commit_is_not_empty() {
        let mut actions = BitActionSet::new();
        actions.mark_sync_all();
        let snapshot = actions.begin_commit();
        assert!(snapshot.sync_all);
        assert!(!snapshot.is_empty());
    }
}
