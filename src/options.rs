//! Compile options, loaded from YAML.
//!
//! ```yaml
//! touch-regions: reject   # or: drop (default)
//! report-dropped: true
//! ```

use crate::error::SimaiError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// What to do with a touch note outside regions A-E
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchRegionPolicy {
    /// Drop the note, like a note on position 0
    #[default]
    Drop,
    /// Fail the fragment with `UnrecognizedTouchRegion`
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    pub touch_regions: TouchRegionPolicy,
    /// Print dropped notes to stderr (CLI only)
    pub report_dropped: bool,
}

impl Options {
    pub fn from_yaml(content: &str) -> Result<Self, SimaiError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| SimaiError::OptionsError(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimaiError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SimaiError::OptionsError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}
