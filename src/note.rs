//! # Note Composition
//!
//! Builds the final note events from note nodes.
//!
//! ## Tap and Hold Notes
//! `1`, `4b`, `2hx[4:1]`: a button digit (1-8) followed by flags. `h` makes the
//! note a hold, `b` (break) and `x` (ex) are kept as modifiers, and `$` (star
//! shaped tap) is kept on taps only. A hold without a duration is zero-length.
//!
//! ## Touch Notes
//! `A1`, `C`, `Ch[2:1]`, `B3f`: a sensor region (A-E), an optional location
//! digit (defaults to location 0), then flags. `h` makes a touch hold and `f`
//! (firework) is the only kept modifier.
//!
//! ## Slide Notes
//! `1-4[4:1]`, `1b>5-8[2:1]`, `1-4[4:1]*-6[4:1]`: a start button, optional star
//! modifiers, then one or more chains. Each chain is assembled by `slide`, its
//! durations resolved by `distribute`, and every segment becomes one
//! [`NoteEvent::Slide`]. All chains of a fan (`*`) share the start button.
//!
//! ## Disabled Notes
//! Position `0` is how charts switch a note off. A note on position 0, a touch
//! note outside regions A-E, or a slide segment that starts, ends or reflects on
//! position 0 is dropped from the output. Drops are logged at debug level and
//! collected as [`DroppedNote`]s; they are not errors.

use crate::distribute::distribute;
use crate::duration::{self, Duration};
use crate::error::SimaiError;
use crate::options::{Options, TouchRegionPolicy};
use crate::primitive::{self, Primitive};
use crate::slide::{self, Position, SlideChain, SlidePattern};
use crate::tree::{LeafKind, NodeKind, ParseNode};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Appended to the modifiers of every note in a pseudo-each group
pub const PSEUDO_EACH_MARKER: char = '`';

const TOUCH_REGIONS: &str = "ABCDE";
const NOTE_MODIFIERS: &str = "bx";
const TAP_ONLY_MODIFIERS: &str = "$";
const TOUCH_MODIFIERS: &str = "f";
const HOLD_FLAG: char = 'h';

/// A fully resolved note. Buttons and locations are zero-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    Tap {
        button: u8,
        modifier: String,
    },
    Hold {
        button: u8,
        modifier: String,
        duration: Duration,
    },
    TouchTap {
        region: char,
        location: u8,
        modifier: String,
    },
    TouchHold {
        region: char,
        location: u8,
        modifier: String,
        duration: Duration,
    },
    Slide {
        start_button: u8,
        /// Modifiers written on the star, before the first connector
        star_modifier: String,
        /// Modifiers of the chain this segment belongs to
        modifier: String,
        pattern: SlidePattern,
        reflect: Option<u8>,
        end_button: u8,
        duration: Duration,
    },
}

impl NoteEvent {
    pub fn modifier(&self) -> &str {
        match self {
            NoteEvent::Tap { modifier, .. }
            | NoteEvent::Hold { modifier, .. }
            | NoteEvent::TouchTap { modifier, .. }
            | NoteEvent::TouchHold { modifier, .. }
            | NoteEvent::Slide { modifier, .. } => modifier,
        }
    }

    pub fn duration(&self) -> Option<&Duration> {
        match self {
            NoteEvent::Hold { duration, .. }
            | NoteEvent::TouchHold { duration, .. }
            | NoteEvent::Slide { duration, .. } => Some(duration),
            NoteEvent::Tap { .. } | NoteEvent::TouchTap { .. } => None,
        }
    }

    /// Mark this note as part of a pseudo-each group. Slides carry the marker
    /// on their star, since the star is what gets struck.
    pub fn mark_pseudo_each(&mut self) {
        match self {
            NoteEvent::Tap { modifier, .. }
            | NoteEvent::Hold { modifier, .. }
            | NoteEvent::TouchTap { modifier, .. }
            | NoteEvent::TouchHold { modifier, .. }
            | NoteEvent::Slide {
                star_modifier: modifier,
                ..
            } => modifier.push(PSEUDO_EACH_MARKER),
        }
    }
}

/// One entry of a compiled fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentEvent {
    /// `(bpm)`
    Tempo(f64),
    /// `{n}`: following notes are 1/n beat apart
    Divisor(f64),
    Note(NoteEvent),
}

impl FragmentEvent {
    pub fn as_note(&self) -> Option<&NoteEvent> {
        match self {
            FragmentEvent::Note(note) => Some(note),
            _ => None,
        }
    }
}

/// Why a note was left out of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Written on position 0
    DisabledPosition,
    UnknownTouchRegion,
    /// A slide segment starting, ending or reflecting on position 0
    DisabledSlideSegment,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::DisabledPosition => "position 0",
            DropReason::UnknownTouchRegion => "unknown touch region",
            DropReason::DisabledSlideSegment => "slide segment touches position 0",
        };
        f.write_str(text)
    }
}

/// A note the compiler left out, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedNote {
    pub kind: NodeKind,
    pub reason: DropReason,
    /// The note (or slide segment) as written
    pub notation: String,
}

/// Builds notes for one fragment and records what it drops.
pub struct Composer<'a> {
    options: &'a Options,
    dropped: Vec<DroppedNote>,
}

impl<'a> Composer<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            options,
            dropped: Vec::new(),
        }
    }

    pub fn into_dropped(self) -> Vec<DroppedNote> {
        self.dropped
    }

    fn drop_note(&mut self, kind: NodeKind, reason: DropReason, notation: String) {
        debug!("Dropping {} '{}': {}", kind, notation, reason);
        self.dropped.push(DroppedNote {
            kind,
            reason,
            notation,
        });
    }

    /// Compose a `tap_hold_note` node
    pub fn tap_hold(&mut self, node: &ParseNode) -> Result<Option<NoteEvent>, SimaiError> {
        let (text, duration) = note_parts(node)?;
        let mut chars = text.chars();
        let digit = chars
            .next()
            .ok_or_else(|| SimaiError::malformed("tap/hold note has no button"))?;
        let flags = chars.as_str();

        let Some(button) = Position::from_char(digit)?.button() else {
            self.drop_note(node.kind, DropReason::DisabledPosition, text.to_string());
            return Ok(None);
        };

        let is_hold = flags.contains(HOLD_FLAG);
        let modifier: String = flags
            .chars()
            .filter(|&c| NOTE_MODIFIERS.contains(c) || (!is_hold && TAP_ONLY_MODIFIERS.contains(c)))
            .collect();

        if is_hold {
            Ok(Some(NoteEvent::Hold {
                button,
                modifier,
                duration: duration.unwrap_or_default(),
            }))
        } else {
            Ok(Some(NoteEvent::Tap { button, modifier }))
        }
    }

    /// Compose a `touch_tap_hold_note` node
    pub fn touch_tap_hold(&mut self, node: &ParseNode) -> Result<Option<NoteEvent>, SimaiError> {
        let (text, duration) = note_parts(node)?;
        let mut chars = text.chars();
        let region = chars
            .next()
            .ok_or_else(|| SimaiError::malformed("touch note has no region"))?;
        let rest = chars.as_str();

        let (location, flags) = match rest.chars().next() {
            Some(c @ '0'..='8') => (Position::from_char(c)?.button(), &rest[1..]),
            _ => (Some(0), rest),
        };

        if !TOUCH_REGIONS.contains(region) {
            if self.options.touch_regions == TouchRegionPolicy::Reject {
                return Err(SimaiError::UnrecognizedTouchRegion(region));
            }
            self.drop_note(node.kind, DropReason::UnknownTouchRegion, text.to_string());
            return Ok(None);
        }

        let Some(location) = location else {
            self.drop_note(node.kind, DropReason::DisabledPosition, text.to_string());
            return Ok(None);
        };

        let is_hold = flags.contains(HOLD_FLAG);
        let modifier: String = flags.chars().filter(|&c| TOUCH_MODIFIERS.contains(c)).collect();

        if is_hold {
            Ok(Some(NoteEvent::TouchHold {
                region,
                location,
                modifier,
                duration: duration.unwrap_or_default(),
            }))
        } else {
            Ok(Some(NoteEvent::TouchTap {
                region,
                location,
                modifier,
            }))
        }
    }

    /// Compose a `slide_note` node into one event per surviving segment
    pub fn slide(&mut self, node: &ParseNode) -> Result<Vec<NoteEvent>, SimaiError> {
        let mut start = None;
        let mut star_modifier = String::new();
        let mut chains = Vec::new();

        for child in node.nodes() {
            match child.kind {
                NodeKind::SlidePos | NodeKind::SlideModifier => match primitive::build(child)? {
                    Primitive::SlidePosition(position) => start = Some(position),
                    // every star flag is kept, not only the last one written
                    Primitive::SlideModifier(c) => star_modifier.push(c),
                    _ => {}
                },
                NodeKind::SlideBeg => chains.push(slide_chain(child)?),
                NodeKind::ChainedSlideNote => {
                    let slide_beg = child
                        .nodes()
                        .find(|n| n.kind == NodeKind::SlideBeg)
                        .ok_or_else(|| SimaiError::malformed("chained slide has no segments"))?;
                    chains.push(slide_chain(slide_beg)?);
                }
                other => {
                    return Err(SimaiError::malformed(format!(
                        "unexpected '{}' inside a slide note",
                        other
                    )))
                }
            }
        }

        let start = start.ok_or_else(|| SimaiError::malformed("slide has no start position"))?;

        let mut events = Vec::new();
        for chain in chains {
            let chain = chain.starting_at(start);
            let durations = distribute(&chain)?;

            for (segment, duration) in chain.segments.iter().zip(durations) {
                let segment_start = segment.start.unwrap_or(start);
                let reflect = match segment.reflect {
                    Some(reflect) => reflect.button().map(Some),
                    None => Some(None),
                };

                match (segment_start.button(), segment.end.button(), reflect) {
                    (Some(start_button), Some(end_button), Some(reflect)) => {
                        events.push(NoteEvent::Slide {
                            start_button,
                            star_modifier: star_modifier.clone(),
                            modifier: chain.modifier.clone(),
                            pattern: segment.pattern,
                            reflect,
                            end_button,
                            duration,
                        })
                    }
                    _ => self.drop_note(
                        node.kind,
                        DropReason::DisabledSlideSegment,
                        segment.to_string(),
                    ),
                }
            }
        }

        Ok(events)
    }
}

/// Assemble the chain under a `slide_beg` node
fn slide_chain(node: &ParseNode) -> Result<SlideChain, SimaiError> {
    let primitives = node
        .nodes()
        .map(primitive::build)
        .collect::<Result<Vec<_>, _>>()?;
    slide::assemble(primitives)
}

/// Note text and optional duration of a tap/hold or touch note
fn note_parts(node: &ParseNode) -> Result<(&str, Option<Duration>), SimaiError> {
    let text = node
        .leaves()
        .find(|leaf| leaf.kind == LeafKind::Text)
        .map(|leaf| leaf.text.as_str())
        .ok_or_else(|| SimaiError::malformed(format!("'{}' has no note text", node.kind)))?;

    let duration = node
        .nodes()
        .find(|n| n.kind == NodeKind::Duration)
        .map(duration::resolve)
        .transpose()?;

    Ok((text, duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Child, Leaf};

    fn note(kind: NodeKind, text: &str, duration: Option<(&str, &str)>) -> ParseNode {
        let mut children = vec![Child::Leaf(Leaf::new(LeafKind::Text, text))];
        if let Some((den, num)) = duration {
            children.push(Child::Node(ParseNode::new(
                NodeKind::Duration,
                vec![
                    Child::Leaf(Leaf::new(LeafKind::Int, den)),
                    Child::Leaf(Leaf::new(LeafKind::Int, num)),
                ],
            )));
        }
        ParseNode::new(kind, children)
    }

    #[test]
    fn test_tap_button_decrement() {
        let options = Options::default();
        for digit in 1..=8u8 {
            let mut composer = Composer::new(&options);
            let text = digit.to_string();
            let event = composer.tap_hold(&note(NodeKind::TapHoldNote, &text, None)).unwrap();
            assert_eq!(
                event,
                Some(NoteEvent::Tap {
                    button: digit - 1,
                    modifier: String::new()
                })
            );
        }
    }

    #[test]
    fn test_tap_position_zero_dropped() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer.tap_hold(&note(NodeKind::TapHoldNote, "0b", None)).unwrap();
        assert_eq!(event, None);
        let dropped = composer.into_dropped();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].reason, DropReason::DisabledPosition);
        assert_eq!(dropped[0].notation, "0b");
    }

    #[test]
    fn test_tap_modifiers() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer.tap_hold(&note(NodeKind::TapHoldNote, "3bx$@", None)).unwrap();
        assert_eq!(
            event,
            Some(NoteEvent::Tap {
                button: 2,
                modifier: "bx$".to_string()
            })
        );
    }

    #[test]
    fn test_hold_drops_star_modifier() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer
            .tap_hold(&note(NodeKind::TapHoldNote, "2h$b", Some(("4", "1"))))
            .unwrap();
        assert_eq!(
            event,
            Some(NoteEvent::Hold {
                button: 1,
                modifier: "b".to_string(),
                duration: Duration::from_fraction(1, 4),
            })
        );
    }

    #[test]
    fn test_hold_without_duration_is_zero_length() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer.tap_hold(&note(NodeKind::TapHoldNote, "5h", None)).unwrap().unwrap();
        assert!(event.duration().unwrap().is_zero());
    }

    #[test]
    fn test_touch_tap() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer
            .touch_tap_hold(&note(NodeKind::TouchTapHoldNote, "B3f", None))
            .unwrap();
        assert_eq!(
            event,
            Some(NoteEvent::TouchTap {
                region: 'B',
                location: 2,
                modifier: "f".to_string()
            })
        );
    }

    #[test]
    fn test_touch_without_location() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer
            .touch_tap_hold(&note(NodeKind::TouchTapHoldNote, "Chf", Some(("2", "1"))))
            .unwrap();
        assert_eq!(
            event,
            Some(NoteEvent::TouchHold {
                region: 'C',
                location: 0,
                modifier: "f".to_string(),
                duration: Duration::from_fraction(1, 2),
            })
        );
    }

    #[test]
    fn test_touch_position_zero_dropped() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer
            .touch_tap_hold(&note(NodeKind::TouchTapHoldNote, "A0", None))
            .unwrap();
        assert_eq!(event, None);
        assert_eq!(composer.into_dropped()[0].reason, DropReason::DisabledPosition);
    }

    #[test]
    fn test_unknown_touch_region() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let event = composer
            .touch_tap_hold(&note(NodeKind::TouchTapHoldNote, "F1", None))
            .unwrap();
        assert_eq!(event, None);
        assert_eq!(composer.into_dropped()[0].reason, DropReason::UnknownTouchRegion);

        let strict = Options {
            touch_regions: TouchRegionPolicy::Reject,
            ..Options::default()
        };
        let mut composer = Composer::new(&strict);
        let result = composer.touch_tap_hold(&note(NodeKind::TouchTapHoldNote, "F1", None));
        assert!(matches!(result, Err(SimaiError::UnrecognizedTouchRegion('F'))));
    }

    #[test]
    fn test_pseudo_each_marker() {
        let mut tap = NoteEvent::Tap {
            button: 0,
            modifier: "b".to_string(),
        };
        tap.mark_pseudo_each();
        assert_eq!(tap.modifier(), "b`");
    }

    #[test]
    fn test_missing_note_text() {
        let options = Options::default();
        let mut composer = Composer::new(&options);
        let node = ParseNode::new(NodeKind::TapHoldNote, vec![]);
        assert!(matches!(composer.tap_hold(&node), Err(SimaiError::MalformedTree(_))));
    }
}
