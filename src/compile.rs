//! # Fragment Compilation
//!
//! Walks a fragment's parse tree in document order and produces its events.
//!
//! ## Dispatch
//! | Node                  | Result                                         |
//! |-----------------------|------------------------------------------------|
//! | `chain`               | children compiled in order and flattened       |
//! | `tempo`, `divisor`    | `FragmentEvent::Tempo` / `Divisor`             |
//! | `tap_hold_note`       | tap or hold (or nothing, if disabled)          |
//! | `touch_tap_hold_note` | touch tap or touch hold (or nothing)           |
//! | `slide_note`          | one slide event per segment                    |
//! | `pseudo_each`         | its notes, each marked with the pseudo-each tag |
//!
//! Any other node kind at this level (a `duration` or `slide_pos` outside its
//! note, for instance) is a [`SimaiError::MalformedTree`]. Leaves directly under
//! a `chain` carry no events and are skipped.
//!
//! ## Failures
//! The first error aborts the whole fragment; no partial result is returned. The
//! error is wrapped in [`SimaiError::Fragment`] together with the fragment text.

use crate::error::SimaiError;
use crate::note::{Composer, DroppedNote, FragmentEvent};
use crate::options::Options;
use crate::primitive::{self, Primitive};
use crate::tree::{Child, FragmentParser, NodeKind, ParseNode};
use log::trace;
use serde::Serialize;

/// Events of one fragment, plus the notes that were switched off
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Compiled {
    pub events: Vec<FragmentEvent>,
    pub dropped: Vec<DroppedNote>,
}

/// Compile a parse tree. `fragment` is the source text, used only for error reports.
pub fn compile_tree(
    tree: &ParseNode,
    fragment: &str,
    options: &Options,
) -> Result<Compiled, SimaiError> {
    let mut composer = Composer::new(options);
    let mut events = Vec::new();

    walk(tree, &mut composer, &mut events).map_err(|e| SimaiError::Fragment {
        fragment: fragment.to_string(),
        source: Box::new(e),
    })?;

    Ok(Compiled {
        events,
        dropped: composer.into_dropped(),
    })
}

/// Parse `fragment` with `parser` and compile the result
pub fn compile_with_parser(
    parser: &impl FragmentParser,
    fragment: &str,
    options: &Options,
) -> Result<Compiled, SimaiError> {
    let tree = parser
        .parse_fragment(fragment)
        .map_err(|e| SimaiError::Fragment {
            fragment: fragment.to_string(),
            source: Box::new(e),
        })?;
    compile_tree(&tree, fragment, options)
}

fn walk(
    node: &ParseNode,
    composer: &mut Composer<'_>,
    out: &mut Vec<FragmentEvent>,
) -> Result<(), SimaiError> {
    trace!("Compiling '{}'", node.kind);

    match node.kind {
        NodeKind::Chain => {
            for child in &node.children {
                if let Child::Node(child) = child {
                    walk(child, composer, out)?;
                }
            }
        }
        NodeKind::Tempo | NodeKind::Divisor => match primitive::build(node)? {
            Primitive::Tempo(bpm) => out.push(FragmentEvent::Tempo(bpm)),
            Primitive::Divisor(divisor) => out.push(FragmentEvent::Divisor(divisor)),
            _ => {}
        },
        NodeKind::TapHoldNote => {
            if let Some(note) = composer.tap_hold(node)? {
                out.push(FragmentEvent::Note(note));
            }
        }
        NodeKind::TouchTapHoldNote => {
            if let Some(note) = composer.touch_tap_hold(node)? {
                out.push(FragmentEvent::Note(note));
            }
        }
        NodeKind::SlideNote => {
            out.extend(composer.slide(node)?.into_iter().map(FragmentEvent::Note));
        }
        NodeKind::PseudoEach => {
            let mut children = node.nodes();
            let (Some(inner), None) = (children.next(), children.next()) else {
                return Err(SimaiError::malformed(
                    "pseudo_each must wrap exactly one note or chain",
                ));
            };

            let mut grouped = Vec::new();
            walk(inner, composer, &mut grouped)?;
            for event in &mut grouped {
                if let FragmentEvent::Note(note) = event {
                    note.mark_pseudo_each();
                }
            }
            out.extend(grouped);
        }
        NodeKind::EquivalentTempo
        | NodeKind::Duration
        | NodeKind::SlidePos
        | NodeKind::SlideConnector
        | NodeKind::SlideModifier
        | NodeKind::SlideBeg
        | NodeKind::ChainedSlideNote => {
            return Err(SimaiError::malformed(format!(
                "'{}' cannot appear outside a note",
                node.kind
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteEvent;
    use crate::tree::{Leaf, LeafKind};

    fn tap(text: &str) -> ParseNode {
        ParseNode::with_leaf(NodeKind::TapHoldNote, LeafKind::Text, text)
    }

    fn chain(children: Vec<ParseNode>) -> ParseNode {
        ParseNode::new(NodeKind::Chain, children.into_iter().map(Child::Node).collect())
    }

    #[test]
    fn test_nested_chains_flatten_in_order() {
        let tree = chain(vec![
            ParseNode::with_leaf(NodeKind::Tempo, LeafKind::Number, "120"),
            chain(vec![tap("1"), chain(vec![tap("2"), tap("3")])]),
            tap("4"),
        ]);
        let compiled = compile_tree(&tree, "(120)1/2/3,4", &Options::default()).unwrap();
        let buttons: Vec<u8> = compiled
            .events
            .iter()
            .filter_map(|e| match e.as_note() {
                Some(NoteEvent::Tap { button, .. }) => Some(*button),
                _ => None,
            })
            .collect();
        assert_eq!(compiled.events[0], FragmentEvent::Tempo(120.0));
        assert_eq!(buttons, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_chain_leaves_are_skipped() {
        let mut tree = chain(vec![tap("1")]);
        tree.children
            .push(Child::Leaf(Leaf::new(LeafKind::Text, "||")));
        let compiled = compile_tree(&tree, "1", &Options::default()).unwrap();
        assert_eq!(compiled.events.len(), 1);
    }

    #[test]
    fn test_pseudo_each_marks_all_notes() {
        let tree = chain(vec![ParseNode::new(
            NodeKind::PseudoEach,
            vec![Child::Node(chain(vec![tap("1b"), tap("2")]))],
        )]);
        let compiled = compile_tree(&tree, "1b`2", &Options::default()).unwrap();
        let modifiers: Vec<&str> = compiled
            .events
            .iter()
            .filter_map(|e| e.as_note())
            .map(|n| n.modifier())
            .collect();
        assert_eq!(modifiers, vec!["b`", "`"]);
    }

    #[test]
    fn test_pseudo_each_of_single_note() {
        let tree = chain(vec![ParseNode::new(NodeKind::PseudoEach, vec![Child::Node(tap("5"))])]);
        let compiled = compile_tree(&tree, "5`", &Options::default()).unwrap();
        assert_eq!(compiled.events[0].as_note().unwrap().modifier(), "`");
    }

    #[test]
    fn test_empty_pseudo_each_is_malformed() {
        let tree = chain(vec![ParseNode::new(NodeKind::PseudoEach, vec![])]);
        let err = compile_tree(&tree, "`", &Options::default()).unwrap_err();
        assert!(matches!(err.root_cause(), SimaiError::MalformedTree(_)));
    }

    #[test]
    fn test_stray_duration_is_malformed() {
        let tree = chain(vec![ParseNode::new(NodeKind::Duration, vec![])]);
        let err = compile_tree(&tree, "[4:1]", &Options::default()).unwrap_err();
        match err {
            SimaiError::Fragment { fragment, source } => {
                assert_eq!(fragment, "[4:1]");
                assert!(matches!(*source, SimaiError::MalformedTree(_)));
            }
            _ => panic!("Expected Fragment error"),
        }
    }

    #[test]
    fn test_dropped_notes_are_collected() {
        let tree = chain(vec![tap("0"), tap("1"), tap("0h")]);
        let compiled = compile_tree(&tree, "0/1/0h", &Options::default()).unwrap();
        assert_eq!(compiled.events.len(), 1);
        assert_eq!(compiled.dropped.len(), 2);
        assert_eq!(compiled.dropped[1].notation, "0h");
    }
}
