//! # Primitive Tokens
//!
//! Maps single grammar matches to small tagged records. Nothing here looks at
//! neighbouring tokens; chaining and validation happen in `slide` and `note`.
//!
//! | Node               | Primitive                                 |
//! |--------------------|-------------------------------------------|
//! | `tempo`            | `Tempo(120.0)` from `(120)`               |
//! | `divisor`          | `Divisor(4.0)` from `{4}`                 |
//! | `equivalent_tempo` | `EquivalentTempo(Some(160.0))` or `None`  |
//! | `duration`         | `Duration(..)`, see `duration::resolve`   |
//! | `slide_pos`        | `SlidePosition(4)`                        |
//! | `slide_connector`  | `SlideConnector { pattern, reflect }`     |
//! | `slide_modifier`   | `SlideModifier('b')`                      |

use crate::duration::{self, Duration};
use crate::error::SimaiError;
use crate::slide::{Position, SlidePattern};
use crate::tree::{NodeKind, ParseNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Tempo(f64),
    /// Never zero
    Divisor(f64),
    /// `None` when the override was matched without a value
    EquivalentTempo(Option<f64>),
    Duration(Duration),
    SlidePosition(Position),
    SlideConnector {
        pattern: SlidePattern,
        reflect: Option<Position>,
    },
    SlideModifier(char),
}

impl Primitive {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Primitive::Tempo(_) => "tempo",
            Primitive::Divisor(_) => "divisor",
            Primitive::EquivalentTempo(_) => "equivalent tempo",
            Primitive::Duration(_) => "duration",
            Primitive::SlidePosition(_) => "slide position",
            Primitive::SlideConnector { .. } => "slide connector",
            Primitive::SlideModifier(_) => "slide modifier",
        }
    }
}

/// Build the primitive for one node. Fails for nodes that are not primitives.
pub fn build(node: &ParseNode) -> Result<Primitive, SimaiError> {
    match node.kind {
        NodeKind::Tempo => Ok(Primitive::Tempo(duration::parse_real(&node.first_leaf()?.text)?)),
        NodeKind::Divisor => {
            let value = duration::parse_real(&node.first_leaf()?.text)?;
            if value == 0.0 {
                return Err(SimaiError::InvalidDivisor);
            }
            Ok(Primitive::Divisor(value))
        }
        NodeKind::EquivalentTempo => {
            let value = node
                .leaves()
                .next()
                .map(|leaf| duration::parse_tempo_override(&leaf.text))
                .transpose()?;
            Ok(Primitive::EquivalentTempo(value))
        }
        NodeKind::Duration => Ok(Primitive::Duration(duration::resolve(node)?)),
        NodeKind::SlidePos => Ok(Primitive::SlidePosition(Position::from_text(
            &node.first_leaf()?.text,
        )?)),
        NodeKind::SlideConnector => {
            let (pattern, reflect) = SlidePattern::from_connector(&node.first_leaf()?.text)?;
            Ok(Primitive::SlideConnector { pattern, reflect })
        }
        NodeKind::SlideModifier => {
            let text = &node.first_leaf()?.text;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Primitive::SlideModifier(c)),
                _ => Err(SimaiError::malformed(format!(
                    "slide modifier '{}' is not a single character",
                    text
                ))),
            }
        }
        other => Err(SimaiError::malformed(format!(
            "'{}' is not a primitive token",
            other
        ))),
    }
}
