//! The script, language and lookup hierarchy of a decompiled table.

use std::collections::{BTreeSet, HashMap, HashSet};

use read_fonts::types::Tag;

use crate::{
    Result,
    error::Error,
    glyph_name::{GlyphMap, GlyphSet},
    glyphs::Classes,
    lookup::{Lookup, LookupUse},
    records::LayoutTable,
    types::{DecompileStats, TableTag},
    writer::{FeatureWriter, TableWriter},
};

pub(crate) const DFLT: Tag = Tag::new(b"DFLT");

/// A decompiled layout table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub tag: TableTag,
    /// In decompiled order.
    pub features: Vec<Feature>,
    /// Classes shared by more than one feature.
    pub classes: Classes,
    /// Lookups shared by more than one feature, in name order.
    pub lookups: Vec<Lookup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub tag: Tag,
    pub scripts: Vec<Script>,
    /// Classes used only by this feature.
    pub classes: Classes,
    pub(crate) defaults_hoisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// `None` is the default script, written as `DFLT`.
    pub tag: Option<Tag>,
    pub languages: Vec<Language>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// `None` is the script's default language.
    pub tag: Option<Tag>,
    /// Whether the default lookups apply before this language's own.
    pub include_default: bool,
    pub lookups: Vec<LookupUse>,
}

/// One language system's use of a feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct LanguageRecord {
    script: Option<Tag>,
    language: Option<Tag>,
    lookup_indices: Vec<u16>,
}

/// Decodes each lookup index once, however many languages use it.
struct Loader<'a> {
    layout: &'a LayoutTable,
    tag: TableTag,
    decoded: HashMap<u16, Lookup>,
}

impl Loader<'_> {
    fn lookup(&mut self, index: u16) -> Result<Lookup> {
        if let Some(lookup) = self.decoded.get(&index) {
            return Ok(lookup.clone());
        }
        let lookup = Lookup::load(self.layout, self.tag, self.layout.lookup(index)?)?;
        self.decoded.insert(index, lookup.clone());
        Ok(lookup)
    }
}

impl Table {
    pub fn new(tag: TableTag) -> Self {
        Self {
            tag,
            ..Default::default()
        }
    }

    /// Build the hierarchy without compressing it.
    ///
    /// Features are ordered by the sorted lookup indices they use, then by
    /// tag, so the result does not depend on feature list order.
    pub fn from_layout(layout: &LayoutTable, tag: TableTag) -> Result<Self> {
        if tag != TableTag::Gsub {
            return Err(Error::UnsupportedTable(tag));
        }

        let mut records: HashMap<Tag, Vec<LanguageRecord>> = HashMap::new();
        for script_record in &layout.script_list {
            let script = (script_record.script_tag != DFLT).then_some(script_record.script_tag);
            let systems = script_record
                .default_lang_sys
                .iter()
                .map(|lang_sys| (None, lang_sys))
                .chain(
                    script_record
                        .lang_sys_records
                        .iter()
                        .map(|record| (Some(record.lang_sys_tag), &record.lang_sys)),
                );
            for (language, lang_sys) in systems {
                for &index in &lang_sys.feature_indices {
                    let feature = layout.feature(index)?;
                    records
                        .entry(feature.feature_tag)
                        .or_default()
                        .push(LanguageRecord {
                            script,
                            language,
                            lookup_indices: feature.lookup_list_indices.clone(),
                        });
                }
            }
        }

        let mut order: Vec<(Vec<u16>, Tag)> = records
            .iter()
            .map(|(tag, records)| {
                let indices: BTreeSet<u16> = records
                    .iter()
                    .flat_map(|record| record.lookup_indices.iter().copied())
                    .collect();
                (indices.into_iter().collect(), *tag)
            })
            .collect();
        order.sort();

        let mut loader = Loader {
            layout,
            tag,
            decoded: HashMap::new(),
        };
        let mut table = Self::new(tag);
        for (_, feature_tag) in order {
            let mut feature_records = records.remove(&feature_tag).unwrap_or_default();
            feature_records.sort();
            table
                .features
                .push(Feature::load(&mut loader, feature_tag, &feature_records)?);
        }
        Ok(table)
    }

    /// Build the hierarchy and compress it.
    pub fn load(layout: &LayoutTable, tag: TableTag) -> Result<Self> {
        let mut table = Self::from_layout(layout, tag)?;
        table.compress()?;
        Ok(table)
    }

    /// Promote shared lookups, then shared classes.
    pub fn compress(&mut self) -> Result<()> {
        self.compress_lookups()?;
        self.compress_classes();
        Ok(())
    }

    pub fn feature(&self, tag: Tag) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.tag == tag)
    }

    pub fn lookup(&self, name: &str) -> Option<&Lookup> {
        self.lookups
            .iter()
            .find(|lookup| lookup.name.as_deref() == Some(name))
    }

    pub fn write(&self, writer: &mut dyn TableWriter) {
        let systems: BTreeSet<(Option<Tag>, Option<Tag>)> = self
            .features
            .iter()
            .flat_map(|feature| &feature.scripts)
            .flat_map(|script| {
                script
                    .languages
                    .iter()
                    .map(move |language| (script.tag, language.tag))
            })
            .collect();
        for (script, language) in systems {
            writer.add_language_system(script.unwrap_or(DFLT), language);
        }

        for (name, class) in self.classes.iter() {
            writer.add_class_definition(name, &class.flatten());
        }

        let mut lookups: Vec<&Lookup> = self.lookups.iter().collect();
        lookups.sort_by(|a, b| a.name.cmp(&b.name));
        for lookup in lookups {
            lookup.write(writer.add_lookup(lookup.name.as_deref().unwrap_or_default()));
        }

        for feature in &self.features {
            feature.write(writer.add_feature(feature.tag));
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        self.classes.remove_glyphs(names);
        for lookup in &mut self.lookups {
            lookup.remove_glyphs(names);
        }
        for feature in &mut self.features {
            feature.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        self.classes.rename_glyphs(mapping);
        for lookup in &mut self.lookups {
            lookup.rename_glyphs(mapping);
        }
        for feature in &mut self.features {
            feature.rename_glyphs(mapping);
        }
    }

    /// Drop what a glyph removal left empty, along with every reference to it.
    pub fn cleanup(&mut self) {
        let dead_classes: HashSet<String> = self.classes.cleanup().into_iter().collect();
        for lookup in &mut self.lookups {
            lookup.cleanup_with(&dead_classes);
        }
        let dead_lookups: HashSet<String> = self
            .lookups
            .iter()
            .filter(|lookup| lookup.is_empty())
            .filter_map(|lookup| lookup.name.clone())
            .collect();
        self.lookups.retain(|lookup| !lookup.is_empty());
        for feature in &mut self.features {
            feature.cleanup_with(&dead_classes, &dead_lookups);
        }
    }

    pub fn stats(&self) -> DecompileStats {
        DecompileStats {
            features: self.features.len(),
            global_lookups: self.lookups.len(),
            inline_lookups: self
                .features
                .iter()
                .flat_map(Feature::lookup_uses)
                .filter(|lookup_use| lookup_use.as_inline().is_some())
                .count(),
            global_classes: self.classes.len(),
            feature_classes: self.features.iter().map(|feature| feature.classes.len()).sum(),
        }
    }
}

impl Feature {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            scripts: Vec::new(),
            classes: Classes::new(),
            defaults_hoisted: false,
        }
    }

    /// One script per run of records sharing a script tag, one language per
    /// record.
    fn load(loader: &mut Loader<'_>, tag: Tag, records: &[LanguageRecord]) -> Result<Self> {
        let mut feature = Self::new(tag);
        for record in records {
            let lookups = record
                .lookup_indices
                .iter()
                .map(|&index| loader.lookup(index).map(LookupUse::Inline))
                .collect::<Result<Vec<_>>>()?;
            // Loaded lists are complete: nothing is inherited until the
            // default lookups are hoisted.
            let language = Language {
                tag: record.language,
                include_default: record.script.is_none() && record.language.is_none(),
                lookups,
            };
            match feature.scripts.last_mut() {
                Some(script) if script.tag == record.script => script.languages.push(language),
                _ => feature.scripts.push(Script {
                    tag: record.script,
                    languages: vec![language],
                }),
            }
        }
        Ok(feature)
    }

    pub fn script(&self, tag: Option<Tag>) -> Option<&Script> {
        self.scripts.iter().find(|script| script.tag == tag)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.scripts.iter().flat_map(|script| &script.languages)
    }

    pub fn languages_mut(&mut self) -> impl Iterator<Item = &mut Language> {
        self.scripts.iter_mut().flat_map(|script| &mut script.languages)
    }

    pub fn lookup_uses(&self) -> impl Iterator<Item = &LookupUse> {
        self.languages().flat_map(|language| &language.lookups)
    }

    pub fn inline_lookups(&self) -> impl Iterator<Item = &Lookup> {
        self.lookup_uses().filter_map(LookupUse::as_inline)
    }

    pub fn inline_lookups_mut(&mut self) -> impl Iterator<Item = &mut Lookup> {
        self.languages_mut()
            .flat_map(|language| &mut language.lookups)
            .filter_map(LookupUse::as_inline_mut)
    }

    pub fn write(&self, writer: &mut dyn FeatureWriter) {
        for (name, class) in self.classes.iter() {
            writer.add_class_definition(name, &class.flatten());
        }
        for script in &self.scripts {
            script.write(writer);
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        self.classes.remove_glyphs(names);
        for script in &mut self.scripts {
            script.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        self.classes.rename_glyphs(mapping);
        for script in &mut self.scripts {
            script.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        self.cleanup_with(&HashSet::new(), &HashSet::new());
    }

    pub(crate) fn cleanup_with(
        &mut self,
        dead_classes: &HashSet<String>,
        dead_lookups: &HashSet<String>,
    ) {
        let mut dead_classes = dead_classes.clone();
        dead_classes.extend(self.classes.cleanup());

        for lookup in self.inline_lookups_mut() {
            lookup.cleanup_with(&dead_classes);
        }
        // An emptied first occurrence takes its later references with it.
        let mut dead_lookups = dead_lookups.clone();
        dead_lookups.extend(
            self.inline_lookups()
                .filter(|lookup| lookup.is_empty())
                .filter_map(|lookup| lookup.name.clone()),
        );
        for script in &mut self.scripts {
            script.drop_lookups(&dead_lookups);
        }
    }
}

impl Script {
    pub fn new(tag: Option<Tag>) -> Self {
        Self {
            tag,
            languages: Vec::new(),
        }
    }

    pub fn language(&self, tag: Option<Tag>) -> Option<&Language> {
        self.languages.iter().find(|language| language.tag == tag)
    }

    pub fn write(&self, writer: &mut dyn FeatureWriter) {
        writer.add_script(self.tag.unwrap_or(DFLT));
        for language in &self.languages {
            language.write(writer);
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        for language in &mut self.languages {
            language.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for language in &mut self.languages {
            language.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        for language in &mut self.languages {
            language.cleanup();
        }
    }

    fn drop_lookups(&mut self, dead_lookups: &HashSet<String>) {
        for language in &mut self.languages {
            language.drop_lookups(dead_lookups);
        }
    }
}

impl Language {
    pub fn new(tag: Option<Tag>) -> Self {
        Self {
            tag,
            include_default: true,
            lookups: Vec::new(),
        }
    }

    pub fn with_lookups(mut self, lookups: impl IntoIterator<Item = LookupUse>) -> Self {
        self.lookups.extend(lookups);
        self
    }

    /// Names of the lookups in use, `None` for unnamed inline lookups.
    pub fn lookup_names(&self) -> Vec<Option<&str>> {
        self.lookups.iter().map(LookupUse::name).collect()
    }

    pub fn write(&self, writer: &mut dyn FeatureWriter) {
        writer.add_language(self.tag, self.include_default);
        for lookup in &self.lookups {
            lookup.write(writer);
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        for lookup in &mut self.lookups {
            lookup.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for lookup in &mut self.lookups {
            lookup.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        for lookup in &mut self.lookups {
            lookup.cleanup();
        }
        self.drop_lookups(&HashSet::new());
    }

    /// Drop emptied inline lookups and references to `dead_lookups`.
    fn drop_lookups(&mut self, dead_lookups: &HashSet<String>) {
        self.lookups.retain(|lookup_use| match lookup_use {
            LookupUse::Inline(lookup) => !lookup.is_empty(),
            LookupUse::Reference(reference) => !dead_lookups.contains(&reference.name),
        });
    }
}
