//! Validated SQL identifiers
//!
//! Table and column names discovered at runtime (parameter names, metadata
//! columns) end up embedded in statement text. They are validated once here
//! and always emitted double-quoted.

use crate::{Error, Result};
use std::fmt;

const MAX_IDENTIFIER_LEN: usize = 128;

/// A table or column name that is safe to embed in statement text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `name` against the safe character set
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidIdentifier(name))
        }
    }

    /// Prepend `prefix` (e.g. `_p_`) and validate the result
    pub fn prefixed(prefix: &str, name: &str) -> Result<Self> {
        Self::new(format!("{}{}", prefix, name))
    }

    /// Raw (unquoted) name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as it appears in statement text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alphanumerics plus `_`, `:`, `.`, `-` and space.
///
/// Names produced by optimizer extensions look like `StagePSO::stage`, hence
/// the colon.
fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-' | ' '))
}

/// Comma-separated quoted column list
pub fn column_list(columns: &[Identifier]) -> String {
    columns
        .iter()
        .map(Identifier::quoted)
        .collect::<Vec<_>>()
        .join(", ")
}
