//! Account code parsing and hierarchy derivation.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Digit lengths for each hierarchy level, level 1 first.
const LEVEL_LENGTHS: [usize; 6] = [1, 2, 4, 6, 8, 10];

/// A validated account code.
///
/// Codes are pure digit strings; the digit count encodes the level
/// (class 1, group 11, account 1105, sub-account 110505, and so on).
/// The parent of a code is the code truncated to the previous level
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    /// Parses and validates a raw code string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode` if the string contains non-digits or its
    /// length does not map to a hierarchy level.
    pub fn parse(code: &str) -> Result<Self, LedgerError> {
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::InvalidCode(code.to_string()));
        }
        if !LEVEL_LENGTHS.contains(&code.len()) {
            return Err(LedgerError::InvalidCode(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hierarchy level (1-6) encoded by the code length.
    #[must_use]
    pub fn level(&self) -> u8 {
        // parse() guarantees the length is one of LEVEL_LENGTHS.
        let idx = LEVEL_LENGTHS
            .iter()
            .position(|&len| len == self.0.len())
            .unwrap_or(0);
        u8::try_from(idx + 1).unwrap_or(1)
    }

    /// Derives the parent code by truncating to the previous level length.
    ///
    /// Level-1 codes have no parent.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let level = self.level();
        if level <= 1 {
            return None;
        }
        let parent_len = LEVEL_LENGTHS[usize::from(level) - 2];
        Some(Self(self.0[..parent_len].to_string()))
    }

    /// Returns true if `self` is a proper ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.level() < other.level() && other.0.starts_with(&self.0)
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
