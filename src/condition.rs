//! Condition terms, sets and lists: the vocabulary a decoder script uses to describe what
//! it is waiting for.

/// One atomic predicate evaluated against a single decoder channel (or nothing, for
/// `AlwaysFalse`/`Skip`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionTerm {
    AlwaysFalse,
    LevelHigh(usize),
    LevelLow(usize),
    EdgeRising(usize),
    EdgeFalling(usize),
    EdgeEither(usize),
    EdgeNone(usize),
    /// Matches once exactly `n` sample ticks have elapsed since the owning set was
    /// installed by a `wait()` call.
    Skip(u64),
}

/// A conjunction of terms: the set matches only when every term matches simultaneously.
#[derive(Clone, Debug)]
pub struct ConditionSet {
    terms: Vec<ConditionTerm>,
    /// Parallel to `terms`; `Some(remaining)` for `Skip` terms, `None` otherwise.
    skip_remaining: Vec<Option<u64>>,
}

impl ConditionSet {
    pub fn new(terms: Vec<ConditionTerm>) -> Self {
        let skip_remaining = terms
            .iter()
            .map(|t| match t {
                ConditionTerm::Skip(n) => Some(*n),
                _ => None,
            })
            .collect();
        Self { terms, skip_remaining }
    }

    pub fn terms(&self) -> &[ConditionTerm] {
        &self.terms
    }

    /// Re-arms the skip countdown(s) for this set. Called when a `wait()` call installs
    /// (or re-installs) this condition list.
    pub(crate) fn reset_skip(&mut self) {
        for (term, remaining) in self.terms.iter().zip(self.skip_remaining.iter_mut()) {
            if let ConditionTerm::Skip(n) = term {
                *remaining = Some(*n);
            }
        }
    }

    pub(crate) fn skip_remaining_mut(&mut self, idx: usize) -> &mut Option<u64> {
        &mut self.skip_remaining[idx]
    }
}

impl From<Vec<ConditionTerm>> for ConditionSet {
    fn from(terms: Vec<ConditionTerm>) -> Self {
        ConditionSet::new(terms)
    }
}

/// A disjunction of condition sets: the list matches when any set matches.
pub type ConditionList = Vec<ConditionSet>;

/// Re-arms skip countdowns across an entire condition list; called once per `wait()` call.
pub fn reset_skips(list: &mut ConditionList) {
    for set in list.iter_mut() {
        set.reset_skip();
    }
}
