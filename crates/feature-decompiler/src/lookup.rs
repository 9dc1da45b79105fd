//! Lookups and the ways a language can use them.

use std::{
    collections::{HashMap, HashSet},
    hash::{Hash, Hasher},
};

use log::debug;

use crate::{
    Result,
    error::Error,
    glyph_name::{GlyphMap, GlyphSet},
    glyphs::Class,
    records::{LayoutTable, LookupRecord},
    subtable::{GsubSubtable, Subtable},
    types::TableTag,
    writer::{FeatureWriter, LookupWriter},
};

/// The rendering attributes of a lookup's flag word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LookupFlag {
    pub right_to_left: bool,
    pub ignore_base_glyphs: bool,
    pub ignore_ligatures: bool,
    pub ignore_marks: bool,
    /// Bits 8 to 15 select a mark attachment class.
    pub mark_attachment_type: bool,
}

impl LookupFlag {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<u16> for LookupFlag {
    fn from(bits: u16) -> Self {
        Self {
            right_to_left: bits & 0x0001 != 0,
            ignore_base_glyphs: bits & 0x0002 != 0,
            ignore_ligatures: bits & 0x0004 != 0,
            ignore_marks: bits & 0x0008 != 0,
            mark_attachment_type: bits & 0xFF00 != 0,
        }
    }
}

/// A typed, flagged list of subtables.
///
/// Equality and hashing cover the type, flag and subtables only. The name
/// is assigned by compression and never affects deduplication.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub name: Option<String>,
    pub lookup_type: u16,
    pub flag: LookupFlag,
    pub subtables: Vec<Subtable>,
}

impl PartialEq for Lookup {
    fn eq(&self, other: &Self) -> bool {
        self.lookup_type == other.lookup_type
            && self.flag == other.flag
            && self.subtables == other.subtables
    }
}

impl Eq for Lookup {}

impl Hash for Lookup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lookup_type.hash(state);
        self.flag.hash(state);
        self.subtables.hash(state);
    }
}

impl Lookup {
    pub fn new(lookup_type: u16, flag: LookupFlag) -> Self {
        Self {
            name: None,
            lookup_type,
            flag,
            subtables: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Decode a lookup record and all of its subtables.
    pub fn load(table: &LayoutTable, tag: TableTag, record: &LookupRecord) -> Result<Self> {
        let mut lookup = Self::new(record.lookup_type, LookupFlag::from(record.lookup_flag));
        match record.lookup_type {
            2 | 5 | 7 => {
                debug!(
                    "Skipping {} subtables of unhandled lookup type {}",
                    record.subtables.len(),
                    record.lookup_type
                );
            }
            1..=7 => {
                lookup.subtables = record
                    .subtables
                    .iter()
                    .map(|subtable| Subtable::load(table, tag, record, subtable))
                    .collect::<Result<_>>()?;
            }
            other => return Err(Error::UnsupportedLookupType(other)),
        }
        Ok(lookup)
    }

    pub fn gsub_subtables(&self) -> impl Iterator<Item = &GsubSubtable> {
        self.subtables.iter().filter_map(Subtable::as_gsub)
    }

    pub fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }

    pub fn write(&self, writer: &mut dyn LookupWriter) {
        writer.add_lookup_flag(self.flag);
        for subtable in &self.subtables {
            subtable.write(writer);
        }
    }

    pub fn potential_classes(&self) -> impl Iterator<Item = &Class> {
        self.subtables.iter().flat_map(Subtable::potential_classes)
    }

    pub fn populate_classes(&mut self, names: &HashMap<Class, String>) {
        for subtable in &mut self.subtables {
            subtable.populate_classes(names);
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        for subtable in &mut self.subtables {
            subtable.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for subtable in &mut self.subtables {
            subtable.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        self.cleanup_with(&HashSet::new());
    }

    pub(crate) fn cleanup_with(&mut self, dead_classes: &HashSet<String>) {
        for subtable in &mut self.subtables {
            subtable.cleanup_with(dead_classes);
        }
        self.subtables.retain(|subtable| !subtable.is_empty());
    }
}

/// A pointer to a named lookup defined elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupReference {
    pub name: String,
}

impl LookupReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One entry of a language's lookup list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupUse {
    Inline(Lookup),
    Reference(LookupReference),
}

impl LookupUse {
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(LookupReference::new(name))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Inline(lookup) => lookup.name.as_deref(),
            Self::Reference(reference) => Some(&reference.name),
        }
    }

    pub fn as_inline(&self) -> Option<&Lookup> {
        match self {
            Self::Inline(lookup) => Some(lookup),
            Self::Reference(_) => None,
        }
    }

    pub fn as_inline_mut(&mut self) -> Option<&mut Lookup> {
        match self {
            Self::Inline(lookup) => Some(lookup),
            Self::Reference(_) => None,
        }
    }

    pub fn write(&self, writer: &mut dyn FeatureWriter) {
        match self {
            Self::Inline(lookup) => lookup.write(writer.add_lookup(lookup.name.as_deref())),
            Self::Reference(reference) => writer.add_lookup_reference(&reference.name),
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        if let Self::Inline(lookup) = self {
            lookup.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        if let Self::Inline(lookup) = self {
            lookup.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        if let Self::Inline(lookup) = self {
            lookup.cleanup();
        }
    }
}
