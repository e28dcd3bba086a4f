//! # Slide Chain Assembly
//!
//! Builds [`SlideChain`]s from the flat run of primitives found under a
//! `slide_beg` node.
//!
//! ## Chains
//! `1-4-7[4:1]` is one slide written as two segments: `1→4` then `4→7`. Each
//! connector opens a new segment whose start is the previous segment's end. The
//! first segment's start is left empty and filled in with the star's button by
//! the note composer, since the star position is written outside `slide_beg`.
//!
//! Modifiers written after segments (`1-4[4:1]b`) apply to the whole chain.
//!
//! ## Duration Policy
//! A finished chain must either carry a duration on its last segment only
//! ([`DurationPolicy::LastOnly`], the total is split across segments) or on every
//! segment ([`DurationPolicy::Every`]). Anything else is
//! [`SimaiError::AmbiguousSlideDuration`].
//!
//! ## Related Modules
//! - `primitive` - Builds the primitives this module consumes
//! - `distribute` - Splits a `LastOnly` total across segments
//! - `note` - Turns segments into slide note events

use crate::duration::Duration;
use crate::error::SimaiError;
use crate::primitive::Primitive;
use serde::Serialize;
use std::fmt;

/// A button digit exactly as written (`0`-`8`).
///
/// Notation is 1-based; `0` is the format's way of disabling a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position(u8);

impl Position {
    pub fn from_char(c: char) -> Result<Self, SimaiError> {
        match c {
            '0'..='8' => Ok(Position(c as u8 - b'0')),
            _ => Err(SimaiError::InvalidNumber(c.to_string())),
        }
    }

    /// Parse single-digit text such as `"4"`
    pub fn from_text(text: &str) -> Result<Self, SimaiError> {
        let mut chars = text.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(SimaiError::InvalidNumber(text.to_string())),
        }
    }

    /// Zero-based button index, or `None` for the disabled position `0`
    pub fn button(self) -> Option<u8> {
        self.0.checked_sub(1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path a slide takes between its start and end buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidePattern {
    Straight,         // -
    Clockwise,        // >
    CounterClockwise, // <
    ShortestArc,      // ^
    ThroughCenter,    // v
    CenterLoopCcw,    // p
    CenterLoopCw,     // q
    OuterLoopCcw,     // pp
    OuterLoopCw,      // qq
    ZigzagS,          // s
    ZigzagZ,          // z
    Fan,              // w
    GrandV,           // V, followed by the reflect position
}

impl SlidePattern {
    /// Decode connector text. `V` connectors carry their reflect position (`V3`).
    pub fn from_connector(text: &str) -> Result<(SlidePattern, Option<Position>), SimaiError> {
        let text = text.trim();
        if let Some(reflect) = text.strip_prefix('V') {
            return Ok((SlidePattern::GrandV, Some(Position::from_text(reflect)?)));
        }

        let pattern = match text {
            "-" => SlidePattern::Straight,
            ">" => SlidePattern::Clockwise,
            "<" => SlidePattern::CounterClockwise,
            "^" => SlidePattern::ShortestArc,
            "v" => SlidePattern::ThroughCenter,
            "p" => SlidePattern::CenterLoopCcw,
            "q" => SlidePattern::CenterLoopCw,
            "pp" => SlidePattern::OuterLoopCcw,
            "qq" => SlidePattern::OuterLoopCw,
            "s" => SlidePattern::ZigzagS,
            "z" => SlidePattern::ZigzagZ,
            "w" => SlidePattern::Fan,
            _ => {
                return Err(SimaiError::malformed(format!(
                    "unknown slide connector '{}'",
                    text
                )))
            }
        };
        Ok((pattern, None))
    }

    /// Connector as written in notation
    pub fn symbol(&self) -> &'static str {
        match self {
            SlidePattern::Straight => "-",
            SlidePattern::Clockwise => ">",
            SlidePattern::CounterClockwise => "<",
            SlidePattern::ShortestArc => "^",
            SlidePattern::ThroughCenter => "v",
            SlidePattern::CenterLoopCcw => "p",
            SlidePattern::CenterLoopCw => "q",
            SlidePattern::OuterLoopCcw => "pp",
            SlidePattern::OuterLoopCw => "qq",
            SlidePattern::ZigzagS => "s",
            SlidePattern::ZigzagZ => "z",
            SlidePattern::Fan => "w",
            SlidePattern::GrandV => "V",
        }
    }
}

/// One finished segment of a slide chain
#[derive(Debug, Clone, PartialEq)]
pub struct SlideSegment {
    /// `None` only for the first segment until the star button is known
    pub start: Option<Position>,
    pub pattern: SlidePattern,
    pub reflect: Option<Position>,
    pub end: Position,
    pub duration: Option<Duration>,
}

impl fmt::Display for SlideSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        f.write_str(self.pattern.symbol())?;
        if let Some(reflect) = self.reflect {
            write!(f, "{}", reflect)?;
        }
        write!(f, "{}", self.end)
    }
}

/// In-progress segment, open until the next connector or the end of input
struct SegmentBuilder {
    start: Option<Position>,
    pattern: SlidePattern,
    reflect: Option<Position>,
    end: Option<Position>,
    duration: Option<Duration>,
}

impl SegmentBuilder {
    fn new(start: Option<Position>, pattern: SlidePattern, reflect: Option<Position>) -> Self {
        Self {
            start,
            pattern,
            reflect,
            end: None,
            duration: None,
        }
    }

    fn build(self) -> Result<SlideSegment, SimaiError> {
        let end = self.end.ok_or_else(|| {
            SimaiError::malformed(format!(
                "slide connector '{}' has no end position",
                self.pattern.symbol()
            ))
        })?;
        Ok(SlideSegment {
            start: self.start,
            pattern: self.pattern,
            reflect: self.reflect,
            end,
            duration: self.duration,
        })
    }
}

/// How a chain's durations were written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    /// Only the last segment has a duration; it is the total for the chain
    LastOnly,
    /// Every segment has its own duration
    Every,
}

/// Segments sharing one start button and one modifier string
#[derive(Debug, Clone, PartialEq)]
pub struct SlideChain {
    pub segments: Vec<SlideSegment>,
    pub modifier: String,
}

impl SlideChain {
    /// Set the start of the first segment
    pub fn starting_at(mut self, start: Position) -> Self {
        if let Some(first) = self.segments.first_mut() {
            first.start = Some(start);
        }
        self
    }

    pub fn duration_policy(&self) -> Result<DurationPolicy, SimaiError> {
        let (last, rest) = self
            .segments
            .split_last()
            .ok_or_else(|| SimaiError::malformed("slide chain has no segments"))?;

        if last.duration.is_none() {
            return Err(SimaiError::AmbiguousSlideDuration);
        }

        let timed = rest.iter().filter(|s| s.duration.is_some()).count();
        if timed == 0 {
            Ok(DurationPolicy::LastOnly)
        } else if timed == rest.len() {
            Ok(DurationPolicy::Every)
        } else {
            Err(SimaiError::AmbiguousSlideDuration)
        }
    }
}

/// Assemble one chain from the primitives of a `slide_beg` node, in source order.
pub fn assemble(primitives: impl IntoIterator<Item = Primitive>) -> Result<SlideChain, SimaiError> {
    let mut segments = Vec::new();
    let mut open: Option<SegmentBuilder> = None;
    let mut modifier = String::new();

    for primitive in primitives {
        match primitive {
            Primitive::SlideConnector { pattern, reflect } => {
                let start = match open.take() {
                    Some(builder) => {
                        let segment = builder.build()?;
                        let end = segment.end;
                        segments.push(segment);
                        Some(end)
                    }
                    None => None,
                };
                open = Some(SegmentBuilder::new(start, pattern, reflect));
            }
            Primitive::SlidePosition(position) => {
                open_segment(&mut open, "slide position")?.end = Some(position);
            }
            Primitive::Duration(duration) => {
                open_segment(&mut open, "slide duration")?.duration = Some(duration);
            }
            Primitive::SlideModifier(c) => modifier.push(c),
            other => {
                return Err(SimaiError::malformed(format!(
                    "unexpected {} inside a slide",
                    other.describe()
                )))
            }
        }
    }

    match open {
        Some(builder) => segments.push(builder.build()?),
        None => return Err(SimaiError::malformed("slide has no connector")),
    }

    Ok(SlideChain { segments, modifier })
}

fn open_segment<'a>(
    open: &'a mut Option<SegmentBuilder>,
    what: &str,
) -> Result<&'a mut SegmentBuilder, SimaiError> {
    open.as_mut()
        .ok_or_else(|| SimaiError::malformed(format!("{} before any slide connector", what)))
}
