//! # Duration Resolution
//!
//! Turns a `duration` match such as `[4:1]` or `[160#8:3]` into an exact
//! [`Duration`].
//!
//! ## Notation
//! - `[den:num]` lasts `num / den` beats. The denominator is written first.
//! - `[bpm#den:num]` additionally carries an equivalent tempo: the beat length is
//!   unchanged, but playback computes real time at `bpm` instead of the current tempo.
//!
//! ## Ticks
//! The playback engine stores time as integer ticks, [`TICKS_PER_BEAT`] per beat.
//! [`Duration::ticks`] rounds half to even, so `[768:1]` (half a tick) becomes 0
//! ticks and `[256:1]` (1.5 ticks) becomes 2.
//!
//! ## Zero Denominators
//! A denominator of 0 or less resolves to a zero-length duration instead of an
//! error, so a typo in one hold does not fail the whole chart.

use crate::error::SimaiError;
use crate::tree::{LeafKind, ParseNode};
use num_rational::Ratio;
use num_traits::Zero;
use serde::Serialize;

/// Fixed timing resolution of the playback engine. Changing it breaks every
/// chart already converted.
pub const TICKS_PER_BEAT: i64 = 384;

/// Exact note length in beats, with an optional equivalent-tempo override
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Duration {
    pub beats: Ratio<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalent_tempo: Option<f64>,
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

impl Duration {
    pub fn new(beats: Ratio<i64>) -> Self {
        Self {
            beats,
            equivalent_tempo: None,
        }
    }

    pub fn zero() -> Self {
        Self::new(Ratio::zero())
    }

    /// `numerator / denominator` beats. Panics if `denominator` is 0.
    pub fn from_fraction(numerator: i64, denominator: i64) -> Self {
        Self::new(Ratio::new(numerator, denominator))
    }

    /// A duration of exactly `ticks` ticks
    pub fn from_ticks(ticks: i64, equivalent_tempo: Option<f64>) -> Self {
        Self {
            beats: Ratio::new(ticks, TICKS_PER_BEAT),
            equivalent_tempo,
        }
    }

    pub fn with_equivalent_tempo(mut self, tempo: Option<f64>) -> Self {
        self.equivalent_tempo = tempo;
        self
    }

    pub fn is_zero(&self) -> bool {
        self.beats.is_zero()
    }

    /// Length in engine ticks, rounded half to even. Fails with
    /// [`SimaiError::InvalidNumber`] when the count does not fit in an `i64`.
    pub fn ticks(&self) -> Result<i64, SimaiError> {
        let numer = i128::from(*self.beats.numer()) * i128::from(TICKS_PER_BEAT);
        let denom = i128::from(*self.beats.denom());
        let base = numer.div_euclid(denom);
        let twice_rem = 2 * numer.rem_euclid(denom);

        let rounded = if twice_rem > denom || (twice_rem == denom && base % 2 != 0) {
            base + 1
        } else {
            base
        };
        i64::try_from(rounded)
            .map_err(|_| SimaiError::InvalidNumber(format!("{} beats", self.beats)))
    }
}

/// Resolve a `duration` node.
///
/// Integer leaves are read in source order: the first is the denominator, the
/// second the numerator. An `EquivalentTempo` leaf (`120#`) sets the tempo override.
pub fn resolve(node: &ParseNode) -> Result<Duration, SimaiError> {
    let mut equivalent_tempo = None;
    let mut denominator: Option<i64> = None;
    let mut numerator: Option<i64> = None;

    for leaf in node.leaves() {
        match leaf.kind {
            LeafKind::Int if denominator.is_none() => {
                let den = parse_int(&leaf.text)?;
                if den <= 0 {
                    return Ok(Duration::zero().with_equivalent_tempo(equivalent_tempo));
                }
                denominator = Some(den);
            }
            LeafKind::Int if numerator.is_none() => {
                numerator = Some(parse_int(&leaf.text)?);
            }
            LeafKind::EquivalentTempo => {
                equivalent_tempo = Some(parse_tempo_override(&leaf.text)?);
            }
            _ => {}
        }
    }

    let denominator = denominator.ok_or(SimaiError::MissingDurationComponent("denominator"))?;
    let numerator = numerator.ok_or(SimaiError::MissingDurationComponent("numerator"))?;

    Ok(Duration::from_fraction(numerator, denominator).with_equivalent_tempo(equivalent_tempo))
}

fn parse_int(text: &str) -> Result<i64, SimaiError> {
    text.trim()
        .parse()
        .map_err(|_| SimaiError::InvalidNumber(text.to_string()))
}

/// Parse a tempo override, with or without its trailing `#`
pub(crate) fn parse_tempo_override(text: &str) -> Result<f64, SimaiError> {
    let value = text.trim().trim_end_matches('#');
    parse_real(value)
}

pub(crate) fn parse_real(text: &str) -> Result<f64, SimaiError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(SimaiError::InvalidNumber(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Child, Leaf, NodeKind};

    fn duration_node(leaves: &[(LeafKind, &str)]) -> ParseNode {
        ParseNode::new(
            NodeKind::Duration,
            leaves
                .iter()
                .map(|(kind, text)| Child::Leaf(Leaf::new(*kind, *text)))
                .collect(),
        )
    }

    #[test]
    fn test_quarter() {
        let d = resolve(&duration_node(&[(LeafKind::Int, "4"), (LeafKind::Int, "1")])).unwrap();
        assert_eq!(d.beats, Ratio::new(1, 4));
        assert_eq!(d.ticks().unwrap(), 96);
        assert_eq!(d.equivalent_tempo, None);
    }

    #[test]
    fn test_equivalent_tempo() {
        let d = resolve(&duration_node(&[
            (LeafKind::EquivalentTempo, "160#"),
            (LeafKind::Int, "8"),
            (LeafKind::Int, "3"),
        ]))
        .unwrap();
        assert_eq!(d.beats, Ratio::new(3, 8));
        assert_eq!(d.equivalent_tempo, Some(160.0));
    }

    #[test]
    fn test_zero_denominator_is_zero_length() {
        let d = resolve(&duration_node(&[(LeafKind::Int, "0"), (LeafKind::Int, "1")])).unwrap();
        assert!(d.is_zero());
        assert_eq!(d.ticks().unwrap(), 0);
    }

    #[test]
    fn test_negative_denominator_is_zero_length() {
        let d = resolve(&duration_node(&[(LeafKind::Int, "-2"), (LeafKind::Int, "1")])).unwrap();
        assert!(d.is_zero());
    }

    #[test]
    fn test_missing_numerator() {
        let err = resolve(&duration_node(&[(LeafKind::Int, "4")])).unwrap_err();
        assert!(matches!(err, SimaiError::MissingDurationComponent("numerator")));
    }

    #[test]
    fn test_missing_denominator() {
        let err = resolve(&duration_node(&[(LeafKind::EquivalentTempo, "120#")])).unwrap_err();
        assert!(matches!(err, SimaiError::MissingDurationComponent("denominator")));
    }

    #[test]
    fn test_ticks_round_half_to_even() {
        // 0.5 ticks
        assert_eq!(Duration::from_fraction(1, 768).ticks().unwrap(), 0);
        // 1.5 ticks
        assert_eq!(Duration::from_fraction(3, 768).ticks().unwrap(), 2);
        // 2.5 ticks
        assert_eq!(Duration::from_fraction(5, 768).ticks().unwrap(), 2);
        // 128.333.. ticks
        assert_eq!(Duration::from_fraction(1, 3).ticks().unwrap(), 128);
    }

    #[test]
    fn test_ticks_overflow_is_an_error() {
        let d = Duration::from_fraction(100_000_000_000_000_000, 1);
        assert!(matches!(d.ticks(), Err(SimaiError::InvalidNumber(_))));
        // largest whole-beat count that still fits
        let max_beats = i64::MAX / TICKS_PER_BEAT;
        assert_eq!(
            Duration::from_fraction(max_beats, 1).ticks().unwrap(),
            max_beats * TICKS_PER_BEAT
        );
    }

    #[test]
    fn test_from_ticks() {
        let d = Duration::from_ticks(96, Some(90.0));
        assert_eq!(d.beats, Ratio::new(1, 4));
        assert_eq!(d.ticks().unwrap(), 96);
        assert_eq!(d.equivalent_tempo, Some(90.0));
    }

    #[test]
    fn test_parse_real_rejects_non_finite() {
        assert!(parse_real("NaN").is_err());
        assert!(parse_real("inf").is_err());
        assert_eq!(parse_real("128.5").unwrap(), 128.5);
    }
}
