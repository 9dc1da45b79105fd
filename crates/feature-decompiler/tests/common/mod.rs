//! Shared fixtures: layout record builders, a recording writer, and a
//! binary font builder.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use font_feature_decompiler::{
    ChainContextRecord, Coverage, FeatureRecord, FeatureWriter, FlatSequence, LangSys,
    LangSysRecord, LayoutTable, LigatureRecord, LookupFlag, LookupRecord, LookupWriter,
    ScriptRecord, SubstLookupRecord, SubtableRecord, TableWriter,
};
use read_fonts::types::Tag;
use write_fonts::{
    FontBuilder,
    tables::{gsub::Gsub, maxp::Maxp, post::Post},
    types::{FWord, Fixed, Version16Dot16},
};

pub const DFLT: Tag = Tag::new(b"DFLT");

pub fn tag(s: &str) -> Tag {
    Tag::new_checked(s.as_bytes()).unwrap()
}

// ============================================================================
// Layout records
// ============================================================================

pub fn single(pairs: &[(&str, &str)]) -> LookupRecord {
    single_with_flag(pairs, 0)
}

pub fn single_with_flag(pairs: &[(&str, &str)], lookup_flag: u16) -> LookupRecord {
    LookupRecord {
        lookup_type: 1,
        lookup_flag,
        subtables: vec![SubtableRecord::Single {
            mapping: pairs
                .iter()
                .map(|&(from, to)| (from.into(), to.into()))
                .collect(),
        }],
    }
}

pub fn alternate(sets: &[(&str, &[&str])]) -> LookupRecord {
    LookupRecord {
        lookup_type: 3,
        lookup_flag: 0,
        subtables: vec![SubtableRecord::Alternate {
            alternates: sets
                .iter()
                .map(|&(glyph, alternates)| {
                    (glyph.into(), alternates.iter().map(|&g| g.into()).collect())
                })
                .collect(),
        }],
    }
}

/// `(components, ligature)` pairs, keyed by their first component.
pub fn ligature(ligatures: &[(&[&str], &str)]) -> LookupRecord {
    let mut by_first: BTreeMap<_, Vec<LigatureRecord>> = BTreeMap::new();
    for &(components, lig_glyph) in ligatures {
        let (first, rest) = components.split_first().unwrap();
        by_first
            .entry((*first).into())
            .or_default()
            .push(LigatureRecord {
                components: rest.iter().map(|&g| g.into()).collect(),
                lig_glyph: lig_glyph.into(),
            });
    }
    LookupRecord {
        lookup_type: 4,
        lookup_flag: 0,
        subtables: vec![SubtableRecord::Ligature {
            ligatures: by_first,
        }],
    }
}

/// A format 3 chained context. `backtrack` is written in reading order and
/// stored nearest glyph first, as in a font.
pub fn chain(
    backtrack: &[&[&str]],
    input: &[&[&str]],
    lookahead: &[&[&str]],
    nested: Option<(u16, u16)>,
) -> LookupRecord {
    let coverage = |glyphs: &&[&str]| Coverage::Table {
        glyphs: glyphs.iter().map(|&g| g.into()).collect(),
    };
    LookupRecord {
        lookup_type: 6,
        lookup_flag: 0,
        subtables: vec![SubtableRecord::ChainContext(ChainContextRecord {
            format: 3,
            backtrack_coverage: backtrack.iter().rev().map(coverage).collect(),
            input_coverage: input.iter().map(coverage).collect(),
            lookahead_coverage: lookahead.iter().map(coverage).collect(),
            subst_lookup_records: nested
                .map(|(sequence_index, lookup_list_index)| SubstLookupRecord {
                    sequence_index,
                    lookup_list_index,
                })
                .into_iter()
                .collect(),
        })],
    }
}

pub fn feature(feature_tag: &str, lookups: &[u16]) -> FeatureRecord {
    FeatureRecord {
        feature_tag: tag(feature_tag),
        lookup_list_indices: lookups.to_vec(),
    }
}

pub fn script(
    script_tag: &str,
    default: Option<&[u16]>,
    languages: &[(&str, &[u16])],
) -> ScriptRecord {
    ScriptRecord {
        script_tag: tag(script_tag),
        default_lang_sys: default.map(|features| LangSys {
            feature_indices: features.to_vec(),
        }),
        lang_sys_records: languages
            .iter()
            .map(|&(language, features)| LangSysRecord {
                lang_sys_tag: tag(language),
                lang_sys: LangSys {
                    feature_indices: features.to_vec(),
                },
            })
            .collect(),
    }
}

// ============================================================================
// Effective rules
// ============================================================================

/// A feature as applied under one script and language.
pub type LanguageKey = (Tag, Option<Tag>, Option<Tag>);

fn context_text(classes: &[Vec<String>]) -> String {
    classes
        .iter()
        .map(|class| format!("[{}]", class.join(" ")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One string per glyph-level effect of a rule. Parallel single
/// substitutions are split into their member pairs, so one class rule and
/// the per-glyph mapping it came from compare equal.
pub fn rule_texts(
    lookup_type: u16,
    backtrack: &[Vec<String>],
    target: &[Vec<String>],
    substitution: Option<&[Vec<String>]>,
    lookahead: &[Vec<String>],
) -> Vec<String> {
    let backtrack = context_text(backtrack);
    let lookahead = context_text(lookahead);
    let bodies: Vec<String> = match substitution {
        None => vec![format!("ignore {}", context_text(target))],
        Some(substitution) if lookup_type == 3 => vec![format!(
            "{} from {}",
            context_text(target),
            context_text(substitution)
        )],
        Some([replacement])
            if target.len() == 1 && target[0].len() == replacement.len() =>
        {
            target[0]
                .iter()
                .zip(replacement)
                .map(|(from, to)| format!("{from} > {to}"))
                .collect()
        }
        Some(substitution) => vec![format!(
            "{} > {}",
            context_text(target),
            context_text(substitution)
        )],
    };
    bodies
        .into_iter()
        .map(|body| format!("{backtrack} | {body} | {lookahead}"))
        .collect()
}

fn names(glyphs: &[impl AsRef<str>]) -> Vec<String> {
    glyphs.iter().map(|g| g.as_ref().to_owned()).collect()
}

fn record_rules(layout: &LayoutTable, record: &LookupRecord) -> Vec<String> {
    let flag = LookupFlag::from(record.lookup_flag);
    let mut rules = Vec::new();
    for subtable in &record.subtables {
        match subtable {
            SubtableRecord::Single { mapping } => {
                for (from, to) in mapping {
                    rules.extend(rule_texts(1, &[], &[names(&[from])], Some([names(&[to])].as_slice()), &[]));
                }
            }
            SubtableRecord::Alternate { alternates } => {
                for (glyph, alternates) in alternates {
                    rules.extend(rule_texts(
                        3,
                        &[],
                        &[names(&[glyph])],
                        Some([names(alternates)].as_slice()),
                        &[],
                    ));
                }
            }
            SubtableRecord::Ligature { ligatures } => {
                for (first, ligatures) in ligatures {
                    for ligature in ligatures {
                        let target: Vec<Vec<String>> = std::iter::once(first)
                            .chain(&ligature.components)
                            .map(|g| names(&[g]))
                            .collect();
                        rules.extend(rule_texts(
                            4,
                            &[],
                            &target,
                            Some([names(&[&ligature.lig_glyph])].as_slice()),
                            &[],
                        ));
                    }
                }
            }
            SubtableRecord::ChainContext(chain) => {
                rules.extend(chain_rules(layout, chain));
            }
            _ => {}
        }
    }
    rules.into_iter().map(|rule| format!("{flag:?} {rule}")).collect()
}

fn chain_rules(layout: &LayoutTable, chain: &ChainContextRecord) -> Vec<String> {
    let coverages = |coverages: &[Coverage]| -> Vec<Vec<String>> {
        coverages.iter().map(|c| names(c.glyphs())).collect()
    };
    let backtrack: Vec<Vec<String>> = coverages(&chain.backtrack_coverage).into_iter().rev().collect();
    let input = coverages(&chain.input_coverage);
    let lookahead = coverages(&chain.lookahead_coverage);

    let Some(record) = chain.subst_lookup_records.first() else {
        return rule_texts(6, &backtrack, &input, None, &lookahead);
    };
    let nested = &layout.lookup_list[record.lookup_list_index as usize];
    let at = record.sequence_index as usize;
    let mut rules = Vec::new();
    for subtable in &nested.subtables {
        match subtable {
            SubtableRecord::Single { mapping } => {
                let backtrack: Vec<Vec<String>> =
                    backtrack.iter().chain(&input[..at]).cloned().collect();
                let lookahead: Vec<Vec<String>> =
                    input[at + 1..].iter().chain(&lookahead).cloned().collect();
                for (from, to) in mapping {
                    if input[at].iter().any(|g| g == from.as_str()) {
                        rules.extend(rule_texts(
                            6,
                            &backtrack,
                            &[names(&[from])],
                            Some([names(&[to])].as_slice()),
                            &lookahead,
                        ));
                    }
                }
            }
            SubtableRecord::Ligature { ligatures } => {
                for (first, ligatures) in ligatures {
                    for ligature in ligatures {
                        let target: Vec<Vec<String>> = std::iter::once(first)
                            .chain(&ligature.components)
                            .map(|g| names(&[g]))
                            .collect();
                        rules.extend(rule_texts(
                            6,
                            &backtrack,
                            &target,
                            Some([names(&[&ligature.lig_glyph])].as_slice()),
                            &lookahead,
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    rules
}

/// The rules each feature applies under each script and language system of
/// the input records.
pub fn expand_layout(layout: &LayoutTable) -> BTreeMap<LanguageKey, Vec<String>> {
    let mut effective: BTreeMap<LanguageKey, Vec<String>> = BTreeMap::new();
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
                let feature = &layout.feature_list[index as usize];
                let rules = effective
                    .entry((feature.feature_tag, script, language))
                    .or_default();
                for &lookup in &feature.lookup_list_indices {
                    rules.extend(record_rules(layout, &layout.lookup_list[lookup as usize]));
                }
            }
        }
    }
    effective
}

// ============================================================================
// Recording writer
// ============================================================================

#[derive(Debug, Default)]
struct RecordedLookup {
    flag: LookupFlag,
    rules: Vec<String>,
}

#[derive(Debug)]
struct RecordedLanguage {
    feature: Tag,
    script: Option<Tag>,
    language: Option<Tag>,
    include_default: bool,
    lookups: Vec<usize>,
}

/// Logs every write call in order and rebuilds the effective rules from
/// what was written.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub calls: Vec<String>,
    classes: HashMap<String, Vec<String>>,
    lookups: Vec<RecordedLookup>,
    names: HashMap<String, usize>,
    languages: Vec<RecordedLanguage>,
    feature: Option<Tag>,
    script: Option<Tag>,
    current: usize,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_lookup(&mut self, name: Option<&str>) {
        self.lookups.push(RecordedLookup::default());
        self.current = self.lookups.len() - 1;
        if let Some(name) = name {
            self.names.insert(name.to_owned(), self.current);
        }
    }

    fn expand(&self, sequence: &FlatSequence) -> Vec<Vec<String>> {
        sequence
            .iter()
            .map(|class| {
                class
                    .iter()
                    .flat_map(|member| match self.classes.get(member) {
                        Some(members) => members.clone(),
                        None => vec![member.clone()],
                    })
                    .collect()
            })
            .collect()
    }

    fn own_rules(&self, language: &RecordedLanguage) -> Vec<String> {
        language
            .lookups
            .iter()
            .flat_map(|&index| {
                let lookup = &self.lookups[index];
                lookup
                    .rules
                    .iter()
                    .map(move |rule| format!("{:?} {rule}", lookup.flag))
            })
            .collect()
    }

    fn find(&self, feature: Tag, script: Option<Tag>, language: Option<Tag>) -> Option<&RecordedLanguage> {
        self.languages
            .iter()
            .find(|l| l.feature == feature && l.script == script && l.language == language)
    }

    /// Rules of the script's default language, with inherited defaults.
    fn script_default(&self, feature: Tag, script: Option<Tag>) -> Option<Vec<String>> {
        let default = self.find(feature, script, None)?;
        let own = self.own_rules(default);
        if script.is_none() || !default.include_default {
            return Some(own);
        }
        let mut rules = self.script_default(feature, None).unwrap_or_default();
        rules.extend(own);
        Some(rules)
    }

    /// The rules each feature applies under each written language, with
    /// inherited default lookups expanded.
    pub fn effective_rules(&self) -> BTreeMap<LanguageKey, Vec<String>> {
        let mut effective = BTreeMap::new();
        for language in &self.languages {
            let key = (language.feature, language.script, language.language);
            let rules = match language.language {
                None => self
                    .script_default(language.feature, language.script)
                    .unwrap_or_default(),
                Some(_) if language.include_default => {
                    let mut rules = self
                        .script_default(language.feature, language.script)
                        .or_else(|| self.script_default(language.feature, None))
                        .unwrap_or_default();
                    rules.extend(self.own_rules(language));
                    rules
                }
                Some(_) => self.own_rules(language),
            };
            effective.insert(key, rules);
        }
        effective
    }
}

impl TableWriter for RecordingWriter {
    fn add_language_system(&mut self, script: Tag, language: Option<Tag>) {
        self.calls
            .push(format!("languagesystem {script} {}", tag_or_dflt(language)));
    }

    fn add_class_definition(&mut self, name: &str, members: &[String]) {
        self.calls.push(format!("class {name}"));
        self.classes.insert(name.to_owned(), members.to_vec());
    }

    fn add_lookup(&mut self, name: &str) -> &mut dyn LookupWriter {
        self.calls.push(format!("lookup {name}"));
        self.start_lookup(Some(name));
        self
    }

    fn add_feature(&mut self, tag: Tag) -> &mut dyn FeatureWriter {
        self.calls.push(format!("feature {tag}"));
        self.feature = Some(tag);
        self
    }
}

impl FeatureWriter for RecordingWriter {
    fn add_class_definition(&mut self, name: &str, members: &[String]) {
        self.calls.push(format!("feature class {name}"));
        self.classes.insert(name.to_owned(), members.to_vec());
    }

    fn add_script(&mut self, tag: Tag) {
        self.calls.push(format!("script {tag}"));
        self.script = (tag != DFLT).then_some(tag);
    }

    fn add_language(&mut self, tag: Option<Tag>, include_default: bool) {
        self.calls
            .push(format!("language {} {include_default}", tag_or_dflt(tag)));
        self.languages.push(RecordedLanguage {
            feature: self.feature.unwrap(),
            script: self.script,
            language: tag,
            include_default,
            lookups: Vec::new(),
        });
    }

    fn add_lookup(&mut self, name: Option<&str>) -> &mut dyn LookupWriter {
        self.calls
            .push(format!("inline {}", name.unwrap_or("<unnamed>")));
        self.start_lookup(name);
        let index = self.current;
        self.languages.last_mut().unwrap().lookups.push(index);
        self
    }

    fn add_lookup_reference(&mut self, name: &str) {
        self.calls.push(format!("reference {name}"));
        let index = self.names[name];
        self.languages.last_mut().unwrap().lookups.push(index);
    }
}

impl LookupWriter for RecordingWriter {
    fn add_lookup_flag(&mut self, flag: LookupFlag) {
        self.lookups[self.current].flag = flag;
    }

    fn add_gsub_subtable(
        &mut self,
        lookup_type: u16,
        target: &[FlatSequence],
        substitution: &[FlatSequence],
        backtrack: &FlatSequence,
        lookahead: &FlatSequence,
    ) {
        self.calls.push(format!("subtable {lookup_type}"));
        let backtrack = self.expand(backtrack);
        let lookahead = self.expand(lookahead);
        let mut rules = Vec::new();
        for (index, target) in target.iter().enumerate() {
            let substitution = substitution.get(index).map(|s| self.expand(s));
            rules.extend(rule_texts(
                lookup_type,
                &backtrack,
                &self.expand(target),
                substitution.as_deref(),
                &lookahead,
            ));
        }
        self.lookups[self.current].rules.extend(rules);
    }
}

fn tag_or_dflt(tag: Option<Tag>) -> String {
    tag.map(|t| t.to_string()).unwrap_or_else(|| "dflt".to_owned())
}

// ============================================================================
// Binary fonts
// ============================================================================

fn maxp(num_glyphs: u16) -> Maxp {
    Maxp {
        num_glyphs,
        max_points: Some(0),
        max_contours: Some(0),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    }
}

fn assemble(maxp: &Maxp, post: &Post, gsub: Option<&Gsub>) -> Vec<u8> {
    let mut builder = FontBuilder::new();
    builder.add_table(maxp).unwrap();
    builder.add_table(post).unwrap();
    if let Some(gsub) = gsub {
        builder.add_table(gsub).unwrap();
    }
    builder.build()
}

/// A font with just `maxp`, a version 2 `post` naming `glyph_names`, and
/// `gsub` if given.
pub fn build_font(glyph_names: &[&str], gsub: Option<&Gsub>) -> Vec<u8> {
    let post = Post::new_v2(glyph_names.to_vec());
    assemble(&maxp(glyph_names.len() as u16), &post, gsub)
}

/// A font whose `GSUB` table is the given bytes, unparsed.
pub fn build_font_with_raw_gsub(glyph_names: &[&str], gsub: Vec<u8>) -> Vec<u8> {
    let mut builder = FontBuilder::new();
    builder.add_table(&maxp(glyph_names.len() as u16)).unwrap();
    builder.add_table(&Post::new_v2(glyph_names.to_vec())).unwrap();
    builder.add_raw(Tag::new(b"GSUB"), gsub);
    builder.build()
}

/// A font whose version 3 `post` table names no glyphs.
pub fn build_unnamed_font(num_glyphs: u16, gsub: Option<&Gsub>) -> Vec<u8> {
    let post = Post {
        version: Version16Dot16::VERSION_3_0,
        italic_angle: Fixed::from_f64(0.0),
        underline_position: FWord::new(-100),
        underline_thickness: FWord::new(50),
        is_fixed_pitch: 0,
        min_mem_type42: 0,
        max_mem_type42: 0,
        min_mem_type1: 0,
        max_mem_type1: 0,
        num_glyphs: None,
        glyph_name_index: None,
        string_data: None,
    };
    assemble(&maxp(num_glyphs), &post, gsub)
}
