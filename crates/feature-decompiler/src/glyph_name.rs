//! Glyph name type
//!
//! Every glyph in the rule model is addressed by name rather than by glyph id,
//! so that decompiled rules stay readable and survive glyph renames.

use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
    fmt::{Display, Formatter, Result},
    ops::Deref,
};

/// A glyph name as it appears in the font's `post` table.
///
/// Ordering is plain string ordering, which is what keys are sorted by
/// when single, alternate and ligature mappings are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphName(String);

/// A set of glyph names, as passed to the `remove_glyphs` methods.
pub type GlyphSet = HashSet<GlyphName>;

/// An old-name to new-name mapping, as passed to the `rename_glyphs` methods.
pub type GlyphMap = HashMap<GlyphName, GlyphName>;

impl GlyphName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for GlyphName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GlyphName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for GlyphName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlyphName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GlyphName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
