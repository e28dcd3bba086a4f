//! # Slide Duration Distribution
//!
//! When a chained slide such as `1-4-7-2[2:1]` declares one duration for the
//! whole chain, that total has to be split across the segments. The engine
//! plays chained segments back to back at a resolution of
//! [`TICKS_PER_BEAT`](crate::duration::TICKS_PER_BEAT) ticks per beat, and a
//! chain whose segment lengths don't add up to the declared total by even one
//! tick makes every following note vanish or crashes the game.
//!
//! ## Split Rule
//! 1. `total = ticks(declared duration)`
//! 2. `base = floor(total / L)`, `lost = total / L - base`
//! 3. Segments `1..L-1` get `base` ticks each. A running remainder grows by
//!    `lost` per segment; whenever it reaches 1, the current segment gets an
//!    extra tick and the remainder drops by 1.
//! 4. The last segment gets whatever is left: `total - assigned`.
//!
//! `lost` and the running remainder are `f64`, accumulated in exactly this
//! order. Converted charts depend on which segments get the extra ticks, and
//! float rounding decides that for totals like 4 ticks over 6 segments
//! (`[0, 1, 0, 1, 1, 1]`, not `[0, 1, 1, 0, 1, 1]`). Segment lengths still sum
//! to `total` and never differ by more than one tick.
//!
//! Chains with a duration on every segment are left alone.

use crate::duration::Duration;
use crate::error::SimaiError;
use crate::slide::{DurationPolicy, SlideChain};

/// Split `total_ticks` across `parts` segments
pub fn split_ticks(total_ticks: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }

    let exact = total_ticks as f64 / parts as f64;
    let base = exact.floor() as i64;
    let lost = exact - base as f64;

    let mut ticks = Vec::with_capacity(parts);
    let mut assigned: i64 = 0;
    let mut missed = 0.0;
    for _ in 1..parts {
        let mut segment = base;
        missed += lost;
        if missed >= 1.0 {
            segment += 1;
            missed -= 1.0;
        }
        assigned += segment;
        ticks.push(segment);
    }
    ticks.push(total_ticks - assigned);
    ticks
}

/// Resolve the duration of every segment of a chain, in chain order.
pub fn distribute(chain: &SlideChain) -> Result<Vec<Duration>, SimaiError> {
    let policy = chain.duration_policy()?;
    let durations: Vec<Duration> = chain.segments.iter().filter_map(|s| s.duration).collect();

    match policy {
        DurationPolicy::Every => Ok(durations),
        DurationPolicy::LastOnly => {
            // duration_policy guarantees the last segment is timed
            let total = match durations.last() {
                Some(total) => *total,
                None => return Err(SimaiError::AmbiguousSlideDuration),
            };
            if chain.segments.len() == 1 {
                return Ok(vec![total]);
            }
            Ok(split_ticks(total.ticks()?, chain.segments.len())
                .into_iter()
                .map(|ticks| Duration::from_ticks(ticks, total.equivalent_tempo))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::TICKS_PER_BEAT;
    use crate::slide::{Position, SlidePattern, SlideSegment};
    use num_rational::Ratio;

    fn chain(durations: &[Option<Duration>]) -> SlideChain {
        let segments = durations
            .iter()
            .enumerate()
            .map(|(i, duration)| SlideSegment {
                start: None,
                pattern: SlidePattern::Straight,
                reflect: None,
                end: Position::from_char(char::from(b'1' + (i % 8) as u8)).unwrap(),
                duration: *duration,
            })
            .collect();
        SlideChain {
            segments,
            modifier: String::new(),
        }
    }

    #[test]
    fn test_even_split() {
        assert_eq!(split_ticks(384, 3), vec![128, 128, 128]);
    }

    #[test]
    fn test_leftover_lands_on_last() {
        assert_eq!(split_ticks(385, 3), vec![128, 128, 129]);
    }

    #[test]
    fn test_leftover_spreads_front_to_back() {
        assert_eq!(split_ticks(386, 3), vec![128, 129, 129]);
        assert_eq!(split_ticks(10, 4), vec![2, 3, 2, 3]);
        assert_eq!(split_ticks(7, 4), vec![1, 2, 2, 2]);
    }

    #[test]
    fn test_float_remainder_placement() {
        // after one carry the remainder is 0.333.. + 0.666.. which sums to just below 1
        assert_eq!(split_ticks(4, 6), vec![0, 1, 0, 1, 1, 1]);
        assert_eq!(split_ticks(386, 6), vec![64, 64, 64, 65, 64, 65]);
        assert_eq!(split_ticks(100, 7), vec![14, 14, 14, 15, 14, 14, 15]);
        assert_eq!(split_ticks(1000, 6), vec![166, 167, 166, 167, 167, 167]);
        assert_eq!(split_ticks(11, 10), vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_fewer_ticks_than_segments() {
        assert_eq!(split_ticks(2, 5), vec![0, 0, 1, 0, 1]);
        assert_eq!(split_ticks(0, 4), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_exact_sum_and_near_uniform() {
        // every duration from 0 to 64 beats in 1/16 steps, plus odd tick counts
        let mut totals: Vec<i64> = (0..=64 * 16).map(|i| i * TICKS_PER_BEAT / 16).collect();
        totals.extend(0..=1000);

        for parts in 1..=16 {
            for &total in &totals {
                let ticks = split_ticks(total, parts);
                assert_eq!(ticks.len(), parts);
                assert_eq!(ticks.iter().sum::<i64>(), total, "sum for {} over {}", total, parts);
                let max = ticks.iter().max().unwrap();
                let min = ticks.iter().min().unwrap();
                assert!(max - min <= 1, "{:?} is not near-uniform", ticks);
            }
        }
    }

    #[test]
    fn test_exact_sum_for_fractional_beats() {
        for parts in 1..=16usize {
            for den in 1..=64i64 {
                for num in 0..=64i64 {
                    let total = Duration::from_fraction(num, den);
                    let segments = vec![None; parts - 1]
                        .into_iter()
                        .chain(std::iter::once(Some(total)))
                        .collect::<Vec<_>>();
                    let resolved = distribute(&chain(&segments)).unwrap();
                    let sum: i64 = resolved.iter().map(|d| d.ticks().unwrap()).sum();
                    assert_eq!(sum, total.ticks().unwrap());
                }
            }
        }
    }

    #[test]
    fn test_single_segment_keeps_declared_duration() {
        let total = Duration::from_fraction(3, 7);
        let resolved = distribute(&chain(&[Some(total)])).unwrap();
        // not rounded to ticks
        assert_eq!(resolved, vec![total]);
    }

    #[test]
    fn test_split_copies_equivalent_tempo() {
        let total = Duration::from_fraction(1, 1).with_equivalent_tempo(Some(200.0));
        let resolved = distribute(&chain(&[None, None, Some(total)])).unwrap();
        assert_eq!(resolved.len(), 3);
        for d in &resolved {
            assert_eq!(d.beats, Ratio::new(1, 3));
            assert_eq!(d.ticks().unwrap(), 128);
            assert_eq!(d.equivalent_tempo, Some(200.0));
        }
    }

    #[test]
    fn test_every_segment_timed_is_unchanged() {
        let durations = vec![
            Some(Duration::from_fraction(1, 8)),
            Some(Duration::from_fraction(1, 3).with_equivalent_tempo(Some(90.0))),
            Some(Duration::from_fraction(5, 16)),
        ];
        let resolved = distribute(&chain(&durations)).unwrap();
        let expected: Vec<Duration> = durations.into_iter().flatten().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_total_too_long_for_ticks() {
        let total = Some(Duration::from_fraction(100_000_000_000_000_000, 1));
        let result = distribute(&chain(&[None, None, total]));
        assert!(matches!(result, Err(SimaiError::InvalidNumber(_))));
    }

    #[test]
    fn test_ambiguous_chain() {
        let quarter = Some(Duration::from_fraction(1, 4));
        let result = distribute(&chain(&[None, quarter, None]));
        assert!(matches!(result, Err(SimaiError::AmbiguousSlideDuration)));
    }
}
