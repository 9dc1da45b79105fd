//! The rule model: lookup subtables normalized to sequences of glyph classes.
//!
//! Every supported lookup type decodes into the same shape. A rule is one
//! `target` sequence paired with the `substitution` sequence at the same
//! index, applied between a shared `backtrack` and `lookahead`.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};

use crate::{
    Result,
    error::Error,
    glyph_name::{GlyphMap, GlyphName, GlyphSet},
    glyphs::{Class, FlatSequence, Sequence},
    lookup::{Lookup, LookupFlag},
    records::{ChainContextRecord, Coverage, LayoutTable, LigatureRecord, LookupRecord, SubtableRecord},
    types::TableTag,
    writer::LookupWriter,
};

/// A decoded subtable, tagged by the layout table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subtable {
    Gsub(GsubSubtable),
}

impl Subtable {
    pub(crate) fn load(
        table: &LayoutTable,
        tag: TableTag,
        lookup: &LookupRecord,
        record: &SubtableRecord,
    ) -> Result<Self> {
        match tag {
            TableTag::Gsub => GsubSubtable::load(table, lookup, record).map(Self::Gsub),
            TableTag::Gpos => Err(Error::UnsupportedTable(tag)),
        }
    }

    pub fn as_gsub(&self) -> Option<&GsubSubtable> {
        match self {
            Self::Gsub(subtable) => Some(subtable),
        }
    }

    pub fn write(&self, writer: &mut dyn LookupWriter) {
        match self {
            Self::Gsub(subtable) => subtable.write(writer),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Gsub(subtable) => subtable.is_empty(),
        }
    }

    pub fn potential_classes(&self) -> Vec<&Class> {
        match self {
            Self::Gsub(subtable) => subtable.potential_classes(),
        }
    }

    pub fn populate_classes(&mut self, names: &HashMap<Class, String>) {
        match self {
            Self::Gsub(subtable) => subtable.populate_classes(names),
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        match self {
            Self::Gsub(subtable) => subtable.remove_glyphs(names),
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        match self {
            Self::Gsub(subtable) => subtable.rename_glyphs(mapping),
        }
    }

    pub fn cleanup(&mut self) {
        self.cleanup_with(&HashSet::new());
    }

    pub(crate) fn cleanup_with(&mut self, dead_classes: &HashSet<String>) {
        match self {
            Self::Gsub(subtable) => subtable.cleanup_with(dead_classes),
        }
    }
}

/// Glyph substitution rules of one lookup type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GsubSubtable {
    pub lookup_type: u16,
    pub backtrack: Sequence,
    pub lookahead: Sequence,
    pub target: Vec<Sequence>,
    pub substitution: Vec<Sequence>,
}

impl GsubSubtable {
    pub fn new(lookup_type: u16) -> Self {
        Self {
            lookup_type,
            ..Default::default()
        }
    }

    /// Decode one subtable record of `lookup`.
    pub(crate) fn load(
        table: &LayoutTable,
        lookup: &LookupRecord,
        record: &SubtableRecord,
    ) -> Result<Self> {
        let lookup_type = lookup.lookup_type;
        let mut subtable = Self::new(lookup_type);
        match (lookup_type, record) {
            (1, SubtableRecord::Single { mapping }) => subtable.load_single(mapping),
            (3, SubtableRecord::Alternate { alternates }) => subtable.load_alternate(alternates),
            (4, SubtableRecord::Ligature { ligatures }) => subtable.load_ligature(ligatures),
            (6, SubtableRecord::ChainContext(chain)) => {
                subtable.load_chain_context(table, lookup.lookup_flag, chain)?
            }
            (2 | 5 | 7, _) => {
                debug!("Lookup type {lookup_type} has no rule model, leaving it empty")
            }
            (1 | 3 | 4 | 6, other) => {
                return Err(Error::SubtableMismatch {
                    lookup_type,
                    found: other.kind(),
                });
            }
            (other, _) => return Err(Error::UnsupportedLookupType(other)),
        }
        Ok(subtable)
    }

    fn load_single(&mut self, mapping: &BTreeMap<GlyphName, GlyphName>) {
        if mapping.is_empty() {
            return;
        }
        let target = Class::from_glyphs(mapping.keys().cloned());
        let substitution = Class::from_glyphs(mapping.values().cloned());
        self.push_rule(Sequence::from(vec![target]), Sequence::from(vec![substitution]));
    }

    fn load_alternate(&mut self, alternates: &BTreeMap<GlyphName, Vec<GlyphName>>) {
        for (glyph, alternates) in alternates {
            self.push_rule(
                Sequence::from(vec![Class::from_glyphs([glyph.clone()])]),
                Sequence::from(vec![Class::from_glyphs(alternates.iter().cloned())]),
            );
        }
    }

    fn load_ligature(&mut self, ligatures: &BTreeMap<GlyphName, Vec<LigatureRecord>>) {
        for (first, ligatures) in ligatures {
            for ligature in ligatures {
                let target = std::iter::once(first)
                    .chain(&ligature.components)
                    .map(|glyph| Class::from_glyphs([glyph.clone()]))
                    .collect();
                let substitution = Sequence::from(vec![Class::from_glyphs([ligature
                    .lig_glyph
                    .clone()])]);
                self.push_rule(target, substitution);
            }
        }
    }

    fn load_chain_context(
        &mut self,
        table: &LayoutTable,
        lookup_flag: u16,
        chain: &ChainContextRecord,
    ) -> Result<()> {
        if chain.format != 3 {
            return Err(Error::UnsupportedChainFormat(chain.format));
        }

        // Backtrack coverages are stored nearest glyph first.
        let mut backtrack: Vec<Class> = chain.backtrack_coverage.iter().rev().map(read_coverage).collect();
        let input: Sequence = chain.input_coverage.iter().map(read_coverage).collect();
        let mut lookahead: Vec<Class> = chain.lookahead_coverage.iter().map(read_coverage).collect();

        match chain.subst_lookup_records.as_slice() {
            [] => self.target.push(input),
            [record] => {
                let nested_record = table.lookup(record.lookup_list_index)?;
                if !matches!(nested_record.lookup_type, 1 | 4) {
                    return Err(Error::UnsupportedNestedLookup(nested_record.lookup_type));
                }
                if nested_record.lookup_flag != lookup_flag {
                    debug!(
                        "Nested lookup {} flag {:?} differs from enclosing flag {:?}",
                        record.lookup_list_index,
                        LookupFlag::from(nested_record.lookup_flag),
                        LookupFlag::from(lookup_flag)
                    );
                }
                let nested = Lookup::load(table, TableTag::Gsub, nested_record)?;
                let at = record.sequence_index as usize;

                for subtable in nested.gsub_subtables() {
                    for (target, substitution) in subtable.rules() {
                        let substitution = substitution.cloned().unwrap_or_default();
                        if nested.lookup_type == 1 {
                            let (target, substitution) =
                                intersect_with_input(target, &substitution, &input, at);
                            self.push_rule(target, substitution);
                        } else {
                            if *target != input {
                                warn!(
                                    "Ligature rule {:?} does not match its context input {:?}, keeping it as is",
                                    target.flatten(),
                                    input.flatten()
                                );
                            }
                            self.push_rule(target.clone(), substitution);
                        }
                    }
                }

                // A single substitution applies at one input position; the
                // positions around it become context.
                if nested.lookup_type == 1 {
                    let before = input.classes().get(..at).unwrap_or(input.classes());
                    let after = input.classes().get(at + 1..).unwrap_or_default();
                    backtrack.extend(before.iter().cloned());
                    lookahead = after.iter().cloned().chain(lookahead).collect();
                }
            }
            records => return Err(Error::MultipleNestedLookups(records.len())),
        }

        self.backtrack = backtrack.into();
        self.lookahead = lookahead.into();
        Ok(())
    }

    fn push_rule(&mut self, target: Sequence, substitution: Sequence) {
        self.target.push(target);
        self.substitution.push(substitution);
    }

    /// Pairs of target and substitution. Ignore rules have no substitution.
    pub fn rules(&self) -> impl Iterator<Item = (&Sequence, Option<&Sequence>)> {
        self.target
            .iter()
            .enumerate()
            .map(|(index, target)| (target, self.substitution.get(index)))
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn write(&self, writer: &mut dyn LookupWriter) {
        let target: Vec<FlatSequence> = self.target.iter().map(Sequence::flatten).collect();
        let substitution: Vec<FlatSequence> = self.substitution.iter().map(Sequence::flatten).collect();
        writer.add_gsub_subtable(
            self.lookup_type,
            &target,
            &substitution,
            &self.backtrack.flatten(),
            &self.lookahead.flatten(),
        );
    }

    /// Classes of more than one member, in scan order.
    ///
    /// Alternate substitutions are not positional, so their alternate lists
    /// are left out.
    pub fn potential_classes(&self) -> Vec<&Class> {
        let substitution: &[Sequence] = if self.lookup_type == 3 { &[] } else { &self.substitution };
        [&self.backtrack, &self.lookahead]
            .into_iter()
            .chain(&self.target)
            .chain(substitution)
            .flat_map(Sequence::iter)
            .filter(|class| class.len() > 1)
            .collect()
    }

    /// Replace every class found in `names` with a reference to its name.
    pub fn populate_classes(&mut self, names: &HashMap<Class, String>) {
        reference_classes(&mut self.backtrack, names);
        reference_classes(&mut self.lookahead, names);
        for sequence in &mut self.target {
            reference_classes(sequence, names);
        }
        if self.lookup_type != 3 {
            for sequence in &mut self.substitution {
                reference_classes(sequence, names);
            }
        }
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        self.backtrack.remove_glyphs(names);
        self.lookahead.remove_glyphs(names);
        let lockstep = self.lookup_type != 3;
        for (index, target) in self.target.iter_mut().enumerate() {
            match self.substitution.get_mut(index) {
                Some(substitution) if lockstep && is_parallel(target, substitution) => {
                    remove_in_lockstep(target, substitution, names)
                }
                Some(substitution) => {
                    target.remove_glyphs(names);
                    substitution.remove_glyphs(names);
                }
                None => target.remove_glyphs(names),
            }
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        self.backtrack.rename_glyphs(mapping);
        self.lookahead.rename_glyphs(mapping);
        for sequence in self.target.iter_mut().chain(&mut self.substitution) {
            sequence.rename_glyphs(mapping);
        }
    }

    pub fn cleanup(&mut self) {
        self.cleanup_with(&HashSet::new());
    }

    /// Prune references to `dead_classes`, compact the context and drop
    /// rules left with an empty position.
    pub(crate) fn cleanup_with(&mut self, dead_classes: &HashSet<String>) {
        for context in [&mut self.backtrack, &mut self.lookahead] {
            context.prune_references(dead_classes);
            context.cleanup();
        }
        for sequence in self.target.iter_mut().chain(&mut self.substitution) {
            sequence.prune_references(dead_classes);
        }

        let check_substitution = self.lookup_type != 3;
        let keep: Vec<bool> = self
            .rules()
            .map(|(target, substitution)| {
                !target.is_empty()
                    && !target.has_empty_class()
                    && !(check_substitution
                        && substitution.is_some_and(Sequence::has_empty_class))
            })
            .collect();
        let mut index = 0;
        self.target.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
        let mut index = 0;
        self.substitution.retain(|_| {
            let kept = keep.get(index).copied().unwrap_or(true);
            index += 1;
            kept
        });
    }
}

fn read_coverage(coverage: &Coverage) -> Class {
    Class::from_glyphs(coverage.glyphs().iter().cloned())
}

fn reference_classes(sequence: &mut Sequence, names: &HashMap<Class, String>) {
    for class in sequence.iter_mut() {
        if let Some(name) = names.get(&*class) {
            *class = Class::reference(name.clone());
        }
    }
}

/// Keep the members of a nested single-substitution rule that the context's
/// input coverage can reach, starting at input position `at`.
fn intersect_with_input(
    target: &Sequence,
    substitution: &Sequence,
    input: &Sequence,
    at: usize,
) -> (Sequence, Sequence) {
    let mut kept_target = Sequence::new();
    let mut kept_substitution = Sequence::new();
    for (position, target_class) in target.iter().enumerate() {
        let Some(coverage) = input.get(at + position) else {
            continue;
        };
        let covered: HashSet<&str> = coverage.glyphs().map(GlyphName::as_str).collect();
        let substitution_class = substitution.get(position);

        let mut new_target = Class::new();
        let mut new_substitution = Class::new();
        for (index, member) in target_class.iter().enumerate() {
            if member.glyph().is_some_and(|glyph| covered.contains(glyph.as_str())) {
                new_target.push(member.clone());
                if let Some(replacement) = substitution_class.and_then(|class| class.get(index)) {
                    new_substitution.push(replacement.clone());
                }
            }
        }
        if !new_target.is_empty() {
            kept_target.push(new_target);
            kept_substitution.push(new_substitution);
        }
    }
    (kept_target, kept_substitution)
}

fn is_parallel(target: &Sequence, substitution: &Sequence) -> bool {
    target.len() == substitution.len()
        && target
            .iter()
            .zip(substitution.iter())
            .all(|(t, s)| t.len() == s.len())
}

fn remove_in_lockstep(target: &mut Sequence, substitution: &mut Sequence, names: &GlyphSet) {
    for (target_class, substitution_class) in target.iter_mut().zip(substitution.iter_mut()) {
        let mut positions = target_class.positions_of(names);
        positions.extend(substitution_class.positions_of(names));
        target_class.remove_positions(&positions);
        substitution_class.remove_positions(&positions);
    }
}
