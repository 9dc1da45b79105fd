//! Core types for decompilation configuration and results.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::{error::Error, table::Table};

/// The layout table a decompilation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TableTag {
    #[default]
    Gsub,
    Gpos,
}

impl Display for TableTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gsub => "GSUB",
            Self::Gpos => "GPOS",
        })
    }
}

impl FromStr for TableTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "GSUB" | "gsub" => Ok(Self::Gsub),
            "GPOS" | "gpos" => Ok(Self::Gpos),
            other => Err(format!("unknown layout table '{other}', expected GSUB or GPOS")),
        }
    }
}

/// Options controlling how a layout table is decompiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompileOptions {
    pub table: TableTag,
    /// Promote shared lookups and classes to named definitions.
    pub compress: bool,
    pub remove_glyphs: Vec<String>,
    pub rename_glyphs: Vec<(String, String)>,
    /// Drop classes, rules and lookups emptied by glyph removal.
    pub cleanup: bool,
}

impl Default for DecompileOptions {
    fn default() -> Self {
        Self {
            table: TableTag::Gsub,
            compress: true,
            remove_glyphs: Vec::new(),
            rename_glyphs: Vec::new(),
            cleanup: true,
        }
    }
}

impl DecompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableTag) -> Self {
        self.table = table;
        self
    }

    pub fn without_compression(mut self) -> Self {
        self.compress = false;
        self
    }

    pub fn with_compression_if(mut self, on: bool) -> Self {
        self.compress = on;
        self
    }

    pub fn without_cleanup(mut self) -> Self {
        self.cleanup = false;
        self
    }

    pub fn with_cleanup_if(mut self, on: bool) -> Self {
        self.cleanup = on;
        self
    }

    pub fn with_removed_glyphs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_glyphs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_renamed_glyphs<I, S, T>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        self.rename_glyphs
            .extend(pairs.into_iter().map(|(from, to)| (from.into(), to.into())));
        self
    }

    /// Add renames written as `old/new,old2/new2`. Blank entries are
    /// ignored; any other entry that is not a single `old/new` pair fails.
    pub fn with_renames_opt<S: AsRef<str>>(self, renames: Option<S>) -> crate::Result<Self> {
        let Some(renames) = renames else {
            return Ok(self);
        };
        let pairs = renames
            .as_ref()
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('/') {
                Some((from, to)) if !from.is_empty() && !to.is_empty() && !to.contains('/') => {
                    Ok((from.to_owned(), to.to_owned()))
                }
                _ => Err(Error::InvalidRename(entry.to_owned())),
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(self.with_renamed_glyphs(pairs))
    }

    pub fn wants_glyph_edits(&self) -> bool {
        !self.remove_glyphs.is_empty() || !self.rename_glyphs.is_empty()
    }
}

/// Result of decompiling a layout table.
#[derive(Debug, Clone)]
pub struct DecompileResult {
    pub table: Table,
    pub stats: DecompileStats,
}

/// Counts describing a decompiled table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompileStats {
    pub features: usize,
    pub global_lookups: usize,
    pub inline_lookups: usize,
    pub global_classes: usize,
    pub feature_classes: usize,
}

impl Display for DecompileStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decompiled {} features, {} lookups ({} shared), {} classes ({} shared)",
            self.features,
            self.global_lookups + self.inline_lookups,
            self.global_lookups,
            self.global_classes + self.feature_classes,
            self.global_classes
        )
    }
}
