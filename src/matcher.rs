//! Evaluates a condition list against the sample the cursor is currently positioned on.

use crate::buffer::SampleBuffer;
use crate::condition::{ConditionList, ConditionSet, ConditionTerm};
use crate::cursor::SampleCursor;
use crate::error::Result;

/// Evaluates every set in `list` against the cursor's current sample, ticking down any
/// `Skip` counters along the way. Returns `None` if no set matched (the caller must then
/// advance the cursor and try again), or `Some(bitmap)` — one bool per set, `true` for
/// every set that matched simultaneously.
///
/// Never advances the cursor itself: at most one sample is evaluated per call.
pub fn evaluate(cursor: &SampleCursor, buf: &SampleBuffer, list: &mut ConditionList) -> Result<Option<Vec<bool>>> {
    let mut matched = vec![false; list.len()];
    let mut any = false;
    for (set, slot) in list.iter_mut().zip(matched.iter_mut()) {
        if evaluate_set(cursor, buf, set)? {
            *slot = true;
            any = true;
        }
    }
    Ok(if any { Some(matched) } else { None })
}

/// A set matches only when every term in it holds for the current sample. `Skip` terms
/// still tick down here even when an earlier term in the same set already failed, since the
/// set as a whole is being evaluated against this sample tick regardless of the outcome.
fn evaluate_set(cursor: &SampleCursor, buf: &SampleBuffer, set: &mut ConditionSet) -> Result<bool> {
    let mut all_match = true;
    for idx in 0..set.terms().len() {
        let term = set.terms()[idx];
        let term_match = match term {
            ConditionTerm::AlwaysFalse => false,
            ConditionTerm::LevelHigh(ch) => cursor.current(buf, ch)? == 1,
            ConditionTerm::LevelLow(ch) => cursor.current(buf, ch)? == 0,
            ConditionTerm::EdgeRising(ch) => cursor.previous(ch)? == 0 && cursor.current(buf, ch)? == 1,
            ConditionTerm::EdgeFalling(ch) => cursor.previous(ch)? == 1 && cursor.current(buf, ch)? == 0,
            ConditionTerm::EdgeEither(ch) => cursor.previous(ch)? != cursor.current(buf, ch)?,
            ConditionTerm::EdgeNone(ch) => cursor.previous(ch)? == cursor.current(buf, ch)?,
            ConditionTerm::Skip(_) => {
                let remaining = set.skip_remaining_mut(idx);
                match *remaining {
                    Some(0) | None => true,
                    Some(r) => {
                        *remaining = Some(r - 1);
                        false
                    }
                }
            }
        };
        if !term_match {
            all_match = false;
        }
    }
    Ok(all_match)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionSet;
    use std::sync::Arc;

    fn cursor_at(samplenum: u64, channels: usize) -> SampleCursor {
        let mut c = SampleCursor::new(channels);
        c.set_channel_map((0..channels).map(Some).collect());
        c.set_samplenum(samplenum);
        c
    }

    fn buf(bytes: &[u8]) -> SampleBuffer {
        SampleBuffer::new(0, bytes.len() as u64, Arc::from(bytes.to_vec()), 1).unwrap()
    }

    #[test]
    fn empty_list_never_matches() {
        let cursor = cursor_at(0, 1);
        let b = buf(&[1]);
        let mut list: ConditionList = vec![];
        assert!(evaluate(&cursor, &b, &mut list).unwrap().is_none());
    }

    #[test]
    fn level_high_matches_current_sample() {
        let cursor = cursor_at(0, 1);
        let b = buf(&[1]);
        let mut list: ConditionList = vec![ConditionSet::new(vec![ConditionTerm::LevelHigh(0)])];
        let result = evaluate(&cursor, &b, &mut list).unwrap();
        assert_eq!(result, Some(vec![true]));
    }

    #[test]
    fn skip_counts_ticks_not_matches() {
        let b = buf(&[0, 0, 0, 0]);
        let mut list: ConditionList = vec![ConditionSet::new(vec![ConditionTerm::Skip(3)])];
        let mut samplenum = 0u64;
        let mut hits = vec![];
        while samplenum < 4 {
            let cursor = cursor_at(samplenum, 1);
            if evaluate(&cursor, &b, &mut list).unwrap().is_some() {
                hits.push(samplenum);
                break;
            }
            samplenum += 1;
        }
        assert_eq!(hits, vec![3]);
    }

    #[test]
    fn multiple_sets_can_match_simultaneously() {
        let cursor = cursor_at(0, 1);
        let b = buf(&[1]);
        let mut list: ConditionList = vec![
            ConditionSet::new(vec![ConditionTerm::LevelHigh(0)]),
            ConditionSet::new(vec![ConditionTerm::AlwaysFalse]),
            ConditionSet::new(vec![ConditionTerm::EdgeEither(0)]),
        ];
        let result = evaluate(&cursor, &b, &mut list).unwrap().unwrap();
        assert_eq!(result, vec![true, false, true]);
    }
}
