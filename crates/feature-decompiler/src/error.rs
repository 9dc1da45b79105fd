//! Error types for layout table decompilation.

use std::result;

use read_fonts::ReadError;

use crate::types::TableTag;

/// Errors that can occur while decompiling a layout table.
///
/// Apart from [`Error::Parse`], [`Error::MissingTable`] and
/// [`Error::InvalidRename`], every variant marks an input shape the rule
/// model cannot represent without guessing, so the decompilation of the whole
/// table is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse font: {0}")]
    Parse(#[from] ReadError),

    #[error("no {0} table in font")]
    MissingTable(TableTag),

    #[error("invalid glyph rename '{0}', expected 'old/new'")]
    InvalidRename(String),

    #[error("decompiling {0} tables is not supported")]
    UnsupportedTable(TableTag),

    #[error("unsupported lookup type {0}")]
    UnsupportedLookupType(u16),

    #[error("lookup type {lookup_type} contains a {found} subtable")]
    SubtableMismatch { lookup_type: u16, found: &'static str },

    #[error("chained contextual substitution format {0} is not supported")]
    UnsupportedChainFormat(u16),

    #[error("chained contextual rule references {0} nested lookups, expected one")]
    MultipleNestedLookups(usize),

    #[error("nested lookup type {0} is not supported in a chained contextual rule")]
    UnsupportedNestedLookup(u16),

    #[error("lookup index {0} is out of range")]
    LookupIndex(u16),

    #[error("feature index {0} is out of range")]
    FeatureIndex(u16),

    #[error("script '{0}' has more than one default language")]
    DuplicateDefaultLanguage(String),

    #[error("script '{script}' lists language '{language}' more than once")]
    DuplicateLanguage { script: String, language: String },
}

pub type Result<T> = result::Result<T, Error>;
