//! # simai-fragment
//!
//! Compiles one fragment of simai chart notation (the events of a single beat,
//! e.g. `(120){4}1/5h[4:1]`) into typed, fully timed note events.
//!
//! ## Pipeline
//! 1. `lexer` / `parser` - fragment text to parse tree (any [`FragmentParser`] works)
//! 2. `primitive` / `duration` - single tokens to primitives and exact durations
//! 3. `slide` / `distribute` - slide chains and their per-segment durations
//! 4. `note` - notes, modifiers, disabled-note handling
//! 5. `compile` - tree walk, flattening, error reporting
//!
//! ## Example
//! ```rust
//! use simai_fragment::{compile_fragment, FragmentEvent, NoteEvent};
//!
//! let events = compile_fragment("1-2-3[1:1]")?;
//! let ticks = events
//!     .iter()
//!     .filter_map(FragmentEvent::as_note)
//!     .filter_map(|n| n.duration())
//!     .map(|d| d.ticks())
//!     .collect::<Result<Vec<i64>, _>>()?;
//! assert_eq!(ticks, vec![128, 128, 128]);
//! # Ok::<(), simai_fragment::SimaiError>(())
//! ```

pub mod compile;
pub mod distribute;
pub mod duration;
pub mod error;
pub mod lexer;
pub mod note;
pub mod options;
pub mod parser;
pub mod primitive;
pub mod slide;
pub mod tree;

pub use compile::{compile_tree, compile_with_parser, Compiled};
pub use duration::{Duration, TICKS_PER_BEAT};
pub use error::SimaiError;
pub use note::{DropReason, DroppedNote, FragmentEvent, NoteEvent, PSEUDO_EACH_MARKER};
pub use options::{Options, TouchRegionPolicy};
pub use parser::SimaiParser;
pub use slide::{Position, SlidePattern};
pub use tree::{Child, FragmentParser, Leaf, LeafKind, NodeKind, ParseNode};

/// Compile a fragment with the built-in parser and default options.
/// This is the main entry point for the library.
pub fn compile_fragment(fragment: &str) -> Result<Vec<FragmentEvent>, SimaiError> {
    compile_fragment_with(fragment, &Options::default()).map(|compiled| compiled.events)
}

/// Compile a fragment with the built-in parser, keeping the list of dropped notes
pub fn compile_fragment_with(fragment: &str, options: &Options) -> Result<Compiled, SimaiError> {
    compile_with_parser(&SimaiParser, fragment, options)
}
