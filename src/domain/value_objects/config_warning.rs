//! Configuration warning value object.

use std::path::PathBuf;

/// Non-fatal problem found while loading `packwright.toml`
///
/// Unknown keys are reported rather than rejected so that a config written
/// for a newer release still loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dotted path of the unknown key (e.g. `image.entrypiont`)
    pub key: String,
    /// Config file the key was found in
    pub file: PathBuf,
    /// 1-indexed line of the key, when it can be located
    pub line: Option<usize>,
    /// Closest known key, if any
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}
