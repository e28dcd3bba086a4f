//! # Error Types
//!
//! This module defines all error types for the fragment compiler.
//!
//! Errors fall into two groups. Structural errors (an ambiguous slide duration,
//! a duration with a missing component, a zero divisor) describe notation that
//! contradicts itself and are always reported. Tree errors (`MalformedTree`,
//! `UnknownNodeKind`) mean the parse tree handed to the compiler does not have
//! the shape the grammar promises.
//!
//! Notes disabled with position `0` are *not* errors; they are dropped and show
//! up only in the diagnostics list of [`crate::Compiled`].
//!
//! ## Usage
//! ```rust
//! use simai_fragment::{compile_fragment, SimaiError};
//!
//! match compile_fragment("1-2[4:1]-3") {
//!     Ok(events) => println!("{} events", events.len()),
//!     Err(e) => match e.root_cause() {
//!         SimaiError::AmbiguousSlideDuration => eprintln!("fix the slide durations"),
//!         other => eprintln!("Error: {}", other),
//!     },
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimaiError {
    /// Syntax error in fragment text, with a 1-based column.
    ///
    /// # Example
    /// ```
    /// # use simai_fragment::SimaiError;
    /// let err = SimaiError::ParseError {
    ///     column: 3,
    ///     message: "Unexpected character: '%'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at column 3: Unexpected character: '%'");
    /// ```
    #[error("Parse error at column {column}: {message}")]
    ParseError { column: usize, message: String },

    /// A `{0}` divisor. Beat lengths are computed by dividing by the divisor.
    #[error("Divisor is 0")]
    InvalidDivisor,

    /// A duration match without its denominator or numerator.
    #[error("Duration has no {0}")]
    MissingDurationComponent(&'static str),

    /// A chained slide where durations are neither on the last segment only
    /// nor on every segment.
    #[error("Ambiguous slide duration: specify the duration on the last segment only, or on every segment of the chain")]
    AmbiguousSlideDuration,

    /// A touch note whose region is not one of A-E (only raised when
    /// touch regions are configured to be rejected).
    #[error("Unrecognized touch region '{0}'")]
    UnrecognizedTouchRegion(char),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    /// The parse tree does not have the shape the grammar produces.
    #[error("Malformed parse tree: {0}")]
    MalformedTree(String),

    #[error("Unknown node kind '{0}'")]
    UnknownNodeKind(String),

    /// Invalid YAML options.
    #[error("Invalid options: {0}")]
    OptionsError(String),

    /// Failure while compiling one fragment, with the fragment text attached.
    ///
    /// # Example
    /// ```
    /// # use simai_fragment::SimaiError;
    /// let err = SimaiError::Fragment {
    ///     fragment: "{0}1".to_string(),
    ///     source: Box::new(SimaiError::InvalidDivisor),
    /// };
    /// assert_eq!(err.to_string(), "Error parsing fragment '{0}1': Divisor is 0");
    /// assert!(matches!(err.root_cause(), SimaiError::InvalidDivisor));
    /// ```
    #[error("Error parsing fragment '{fragment}': {source}")]
    Fragment {
        fragment: String,
        #[source]
        source: Box<SimaiError>,
    },
}

impl SimaiError {
    /// The underlying cause, looking through any fragment wrappers.
    pub fn root_cause(&self) -> &SimaiError {
        match self {
            SimaiError::Fragment { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        SimaiError::MalformedTree(message.into())
    }
}
