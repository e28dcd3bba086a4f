//! # Parse Tree Types
//!
//! This module defines the parse tree the compiler consumes. A tree is produced by
//! a [`FragmentParser`]: the crate ships [`crate::SimaiParser`], but any parser
//! that emits the same node kinds can be plugged in. Trees also (de)serialize with
//! serde, so a tree produced by an external tool can be loaded from YAML.
//!
//! ## Tree Shape
//! ```text
//! chain
//!   ├── tempo[Number]
//!   ├── divisor[Number]
//!   ├── tap_hold_note[Text, duration?]
//!   ├── touch_tap_hold_note[Text, duration?]
//!   ├── slide_note
//!   │     ├── slide_pos[Position]
//!   │     ├── slide_modifier[Modifier]*      (star modifiers)
//!   │     ├── slide_beg
//!   │     │     └── (slide_connector slide_pos duration? slide_modifier*)+
//!   │     └── chained_slide_note[slide_beg]*
//!   ├── pseudo_each[chain | note]
//!   └── chain[...]                          (each group, flattened)
//!
//! duration[EquivalentTempo?, Int (denominator), Int (numerator)]
//! ```
//!
//! ## Node Names
//! Node kinds serialize with the grammar's rule names (`tap_hold_note`,
//! `slide_beg`, ...). [`NodeKind::from_str`] rejects anything else with
//! [`SimaiError::UnknownNodeKind`].

use crate::error::SimaiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grammar rule that produced a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Chain,
    Tempo,
    Divisor,
    EquivalentTempo,
    Duration,
    SlidePos,
    SlideConnector,
    SlideModifier,
    SlideBeg,
    ChainedSlideNote,
    SlideNote,
    TapHoldNote,
    TouchTapHoldNote,
    PseudoEach,
}

impl NodeKind {
    pub const ALL: [NodeKind; 14] = [
        NodeKind::Chain,
        NodeKind::Tempo,
        NodeKind::Divisor,
        NodeKind::EquivalentTempo,
        NodeKind::Duration,
        NodeKind::SlidePos,
        NodeKind::SlideConnector,
        NodeKind::SlideModifier,
        NodeKind::SlideBeg,
        NodeKind::ChainedSlideNote,
        NodeKind::SlideNote,
        NodeKind::TapHoldNote,
        NodeKind::TouchTapHoldNote,
        NodeKind::PseudoEach,
    ];

    /// The grammar rule name
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Chain => "chain",
            NodeKind::Tempo => "tempo",
            NodeKind::Divisor => "divisor",
            NodeKind::EquivalentTempo => "equivalent_tempo",
            NodeKind::Duration => "duration",
            NodeKind::SlidePos => "slide_pos",
            NodeKind::SlideConnector => "slide_connector",
            NodeKind::SlideModifier => "slide_modifier",
            NodeKind::SlideBeg => "slide_beg",
            NodeKind::ChainedSlideNote => "chained_slide_note",
            NodeKind::SlideNote => "slide_note",
            NodeKind::TapHoldNote => "tap_hold_note",
            NodeKind::TouchTapHoldNote => "touch_tap_hold_note",
            NodeKind::PseudoEach => "pseudo_each",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeKind {
    type Err = SimaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SimaiError::UnknownNodeKind(s.to_string()))
    }
}

/// Terminal type of a matched leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    Int,
    Number,
    /// A tempo override, written with its trailing `#` (e.g. `120#`)
    EquivalentTempo,
    Position,
    Connector,
    Modifier,
    /// Raw note text (e.g. `1bh`, `C2f`)
    Text,
}

/// Matched text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub kind: LeafKind,
    pub text: String,
}

impl Leaf {
    pub fn new(kind: LeafKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Child {
    Node(ParseNode),
    Leaf(Leaf),
}

/// A matched grammar rule and its children in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Child>,
}

impl ParseNode {
    pub fn new(kind: NodeKind, children: Vec<Child>) -> Self {
        Self { kind, children }
    }

    /// A node holding a single leaf, e.g. `tempo[Number "120"]`
    pub fn with_leaf(kind: NodeKind, leaf_kind: LeafKind, text: impl Into<String>) -> Self {
        Self::new(kind, vec![Child::Leaf(Leaf::new(leaf_kind, text))])
    }

    /// Child nodes, skipping leaves
    pub fn nodes(&self) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter_map(|c| match c {
            Child::Node(n) => Some(n),
            Child::Leaf(_) => None,
        })
    }

    /// Child leaves, skipping nodes
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.children.iter().filter_map(|c| match c {
            Child::Leaf(l) => Some(l),
            Child::Node(_) => None,
        })
    }

    /// The first leaf, for single-terminal rules like `tempo` or `slide_pos`
    pub fn first_leaf(&self) -> Result<&Leaf, SimaiError> {
        self.leaves()
            .next()
            .ok_or_else(|| SimaiError::malformed(format!("'{}' has no matched text", self.kind)))
    }
}

/// Anything that turns fragment text into a parse tree rooted at a `chain` node.
pub trait FragmentParser {
    fn parse_fragment(&self, text: &str) -> Result<ParseNode, SimaiError>;
}
