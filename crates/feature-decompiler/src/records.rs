//! The materialized layout-table object graph consumed by the decompiler.
//!
//! These records mirror the OpenType ScriptList, FeatureList and LookupList
//! structures with glyph ids already resolved to names. They are produced by
//! [`Font::layout_table`](crate::Font::layout_table) from binary font data,
//! or built by hand, and are never mutated by the decompiler.

use std::collections::BTreeMap;

use read_fonts::types::Tag;

use crate::{
    Result,
    error::Error,
    glyph_name::GlyphName,
};

/// A parsed GSUB or GPOS table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutTable {
    pub script_list: Vec<ScriptRecord>,
    pub feature_list: Vec<FeatureRecord>,
    pub lookup_list: Vec<LookupRecord>,
}

impl LayoutTable {
    pub fn feature(&self, index: u16) -> Result<&FeatureRecord> {
        self.feature_list
            .get(index as usize)
            .ok_or(Error::FeatureIndex(index))
    }

    pub fn lookup(&self, index: u16) -> Result<&LookupRecord> {
        self.lookup_list
            .get(index as usize)
            .ok_or(Error::LookupIndex(index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub script_tag: Tag,
    pub default_lang_sys: Option<LangSys>,
    pub lang_sys_records: Vec<LangSysRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSysRecord {
    pub lang_sys_tag: Tag,
    pub lang_sys: LangSys,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LangSys {
    pub feature_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub feature_tag: Tag,
    pub lookup_list_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRecord {
    pub lookup_type: u16,
    pub lookup_flag: u16,
    pub subtables: Vec<SubtableRecord>,
}

/// One lookup subtable, shaped per lookup type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtableRecord {
    /// Type 1.
    Single { mapping: BTreeMap<GlyphName, GlyphName> },
    /// Type 2.
    Multiple { mapping: BTreeMap<GlyphName, Vec<GlyphName>> },
    /// Type 3.
    Alternate { alternates: BTreeMap<GlyphName, Vec<GlyphName>> },
    /// Type 4, keyed by the first component.
    Ligature { ligatures: BTreeMap<GlyphName, Vec<LigatureRecord>> },
    /// Type 5.
    Context { format: u16 },
    /// Type 6.
    ChainContext(ChainContextRecord),
    /// Type 7.
    Extension { extension_lookup_type: u16 },
    /// Type 8.
    ReverseChainSingle,
}

impl SubtableRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single substitution",
            Self::Multiple { .. } => "multiple substitution",
            Self::Alternate { .. } => "alternate substitution",
            Self::Ligature { .. } => "ligature substitution",
            Self::Context { .. } => "contextual substitution",
            Self::ChainContext(_) => "chained contextual substitution",
            Self::Extension { .. } => "extension",
            Self::ReverseChainSingle => "reverse chaining single substitution",
        }
    }
}

/// A ligature: the components after the first glyph, and the ligature glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureRecord {
    pub components: Vec<GlyphName>,
    pub lig_glyph: GlyphName,
}

/// A chained contextual subtable. Only format 3 carries coverages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainContextRecord {
    pub format: u16,
    /// In table order, i.e. nearest glyph first.
    pub backtrack_coverage: Vec<Coverage>,
    pub input_coverage: Vec<Coverage>,
    pub lookahead_coverage: Vec<Coverage>,
    pub subst_lookup_records: Vec<SubstLookupRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstLookupRecord {
    pub sequence_index: u16,
    pub lookup_list_index: u16,
}

/// A set of glyphs a rule position matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    Table { glyphs: Vec<GlyphName> },
    Glyphs(Vec<GlyphName>),
}

impl Coverage {
    pub fn glyphs(&self) -> &[GlyphName] {
        match self {
            Self::Table { glyphs } | Self::Glyphs(glyphs) => glyphs,
        }
    }
}
