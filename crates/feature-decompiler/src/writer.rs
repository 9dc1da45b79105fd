//! The write protocol a decompiled table drives.
//!
//! [`Table::write`](crate::Table::write) calls, in order: one
//! [`TableWriter::add_language_system`] per distinct script and language
//! pair, one [`TableWriter::add_class_definition`] per table-global class,
//! one [`TableWriter::add_lookup`] per table-global lookup in name order,
//! then one [`TableWriter::add_feature`] per feature in decompiled order.
//! Class references are flattened to their `@`-prefixed names before any
//! call, so writers only ever see plain strings.

use read_fonts::types::Tag;

use crate::{glyphs::FlatSequence, lookup::LookupFlag};

pub trait TableWriter {
    /// `language` is `None` for a script's default language.
    fn add_language_system(&mut self, script: Tag, language: Option<Tag>);

    fn add_class_definition(&mut self, name: &str, members: &[String]);

    fn add_lookup(&mut self, name: &str) -> &mut dyn LookupWriter;

    fn add_feature(&mut self, tag: Tag) -> &mut dyn FeatureWriter;
}

pub trait FeatureWriter {
    fn add_class_definition(&mut self, name: &str, members: &[String]);

    fn add_script(&mut self, tag: Tag);

    /// `include_default` is false when the language does not inherit the
    /// default lookups and lists all of its lookups itself.
    fn add_language(&mut self, tag: Option<Tag>, include_default: bool);

    /// An inline lookup. Unnamed lookups cannot be referenced.
    fn add_lookup(&mut self, name: Option<&str>) -> &mut dyn LookupWriter;

    fn add_lookup_reference(&mut self, name: &str);
}

pub trait LookupWriter {
    fn add_lookup_flag(&mut self, flag: LookupFlag);

    /// One subtable's rules: `target[i]` is replaced by `substitution[i]`.
    /// Ignore rules have a target and no substitution.
    fn add_gsub_subtable(
        &mut self,
        lookup_type: u16,
        target: &[FlatSequence],
        substitution: &[FlatSequence],
        backtrack: &FlatSequence,
        lookahead: &FlatSequence,
    );
}
