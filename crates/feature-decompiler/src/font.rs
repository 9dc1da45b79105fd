//! Reading layout tables out of binary font data.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Formatter,
    result,
};

use read_fonts::{
    FontRef, ReadError, TableProvider,
    tables::{
        gsub::{
            AlternateSubstFormat1, ChainedSequenceContext, Gsub, LigatureSubstFormat1,
            MultipleSubstFormat1, SequenceContext, SingleSubst, SubstitutionLookup,
            SubstitutionSubtables,
        },
        layout::{self, CoverageTable},
    },
    types::GlyphId16,
};

use crate::{
    Result,
    error::Error,
    glyph_name::GlyphName,
    records::{
        ChainContextRecord, Coverage, FeatureRecord, LangSys, LangSysRecord, LayoutTable,
        LigatureRecord, LookupRecord, ScriptRecord, SubstLookupRecord, SubtableRecord,
    },
    types::TableTag,
};

/// A parsed font ready for decompilation.
pub struct Font<'a> {
    data: &'a [u8],
    inner: FontRef<'a>,
}

impl std::fmt::Debug for Font<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<'a> TryFrom<&'a [u8]> for Font<'a> {
    type Error = Error;

    fn try_from(data: &'a [u8]) -> Result<Self> {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Font<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> Font<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Ok(Self {
            data,
            inner: FontRef::new(data)?,
        })
    }

    /// Materialize a layout table with glyph ids resolved to names.
    pub fn layout_table(&self, tag: TableTag) -> Result<LayoutTable> {
        match tag {
            TableTag::Gsub => {
                let gsub = match self.inner.gsub() {
                    Ok(gsub) => gsub,
                    Err(ReadError::TableIsMissing(_)) => return Err(Error::MissingTable(tag)),
                    Err(e) => return Err(e.into()),
                };
                GsubReader {
                    gsub: &gsub,
                    names: GlyphNames::from_font(&self.inner),
                }
                .read()
            }
            TableTag::Gpos => Err(Error::UnsupportedTable(tag)),
        }
    }
}

/// Glyph names from `post`, with `gid<N>` for glyphs it does not name.
struct GlyphNames(HashMap<u16, GlyphName>);

impl GlyphNames {
    fn from_font(font: &FontRef) -> Self {
        let names = font
            .post()
            .ok()
            .zip(font.maxp().ok())
            .map(|(post, maxp)| {
                (0..maxp.num_glyphs())
                    .filter_map(|gid| {
                        post.glyph_name(GlyphId16::new(gid))
                            .map(|n| (gid, GlyphName::from(n)))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self(names)
    }

    fn get(&self, gid: u16) -> GlyphName {
        self.0
            .get(&gid)
            .cloned()
            .unwrap_or_else(|| GlyphName::new(format!("gid{gid}")))
    }

    fn glyph(&self, gid: GlyphId16) -> GlyphName {
        self.get(gid.to_u32() as u16)
    }

    fn coverage(&self, coverage: &CoverageTable) -> Vec<GlyphName> {
        coverage.iter().map(|gid| self.glyph(gid)).collect()
    }
}

struct GsubReader<'a> {
    gsub: &'a Gsub<'a>,
    names: GlyphNames,
}

impl GsubReader<'_> {
    fn read(&self) -> Result<LayoutTable> {
        Ok(LayoutTable {
            script_list: self.scripts()?,
            feature_list: self.features()?,
            lookup_list: self.lookups()?,
        })
    }

    fn scripts(&self) -> Result<Vec<ScriptRecord>> {
        let script_list = self.gsub.script_list()?;
        script_list
            .script_records()
            .iter()
            .map(|record| -> Result<ScriptRecord> {
                let script = record.script(script_list.offset_data())?;
                let default_lang_sys = script
                    .default_lang_sys()
                    .transpose()?
                    .map(|lang_sys| read_lang_sys(&lang_sys));
                let lang_sys_records = script
                    .lang_sys_records()
                    .iter()
                    .map(|lang_record| -> Result<LangSysRecord> {
                        let lang_sys = lang_record.lang_sys(script.offset_data())?;
                        Ok(LangSysRecord {
                            lang_sys_tag: lang_record.lang_sys_tag(),
                            lang_sys: read_lang_sys(&lang_sys),
                        })
                    })
                    .collect::<Result<_>>()?;
                Ok(ScriptRecord {
                    script_tag: record.script_tag(),
                    default_lang_sys,
                    lang_sys_records,
                })
            })
            .collect()
    }

    fn features(&self) -> Result<Vec<FeatureRecord>> {
        let feature_list = self.gsub.feature_list()?;
        feature_list
            .feature_records()
            .iter()
            .map(|record| -> Result<FeatureRecord> {
                let feature = record.feature(feature_list.offset_data())?;
                Ok(FeatureRecord {
                    feature_tag: record.feature_tag(),
                    lookup_list_indices: feature
                        .lookup_list_indices()
                        .iter()
                        .map(|i| i.get())
                        .collect(),
                })
            })
            .collect()
    }

    fn lookups(&self) -> Result<Vec<LookupRecord>> {
        let lookup_list = self.gsub.lookup_list()?;
        lookup_list
            .lookups()
            .iter()
            .map(|lookup| self.lookup(&lookup?))
            .collect()
    }

    /// Extension lookups are unwrapped and take the type of their subtables.
    fn lookup(&self, lookup: &SubstitutionLookup<'_>) -> Result<LookupRecord> {
        let (lookup_type, subtables) = match lookup.subtables()? {
            SubstitutionSubtables::Single(tables) => (
                1,
                tables
                    .iter()
                    .map(|t| self.single(&t?))
                    .collect::<Result<_>>()?,
            ),
            SubstitutionSubtables::Multiple(tables) => (
                2,
                tables
                    .iter()
                    .map(|t| self.multiple(&t?))
                    .collect::<Result<_>>()?,
            ),
            SubstitutionSubtables::Alternate(tables) => (
                3,
                tables
                    .iter()
                    .map(|t| self.alternate(&t?))
                    .collect::<Result<_>>()?,
            ),
            SubstitutionSubtables::Ligature(tables) => (
                4,
                tables
                    .iter()
                    .map(|t| self.ligature(&t?))
                    .collect::<Result<_>>()?,
            ),
            SubstitutionSubtables::Contextual(tables) => (
                5,
                tables
                    .iter()
                    .map(|t| {
                        let format = match t? {
                            SequenceContext::Format1(_) => 1,
                            SequenceContext::Format2(_) => 2,
                            SequenceContext::Format3(_) => 3,
                        };
                        Ok(SubtableRecord::Context { format })
                    })
                    .collect::<Result<_>>()?,
            ),
            SubstitutionSubtables::ChainContextual(tables) => (
                6,
                tables
                    .iter()
                    .map(|t| self.chain_context(&t?))
                    .collect::<Result<_>>()?,
            ),
            // Nothing can represent reverse chaining rules, so only the type
            // is kept.
            SubstitutionSubtables::Reverse(_) => (8, Vec::new()),
        };
        Ok(LookupRecord {
            lookup_type,
            lookup_flag: lookup.lookup_flag().to_bits(),
            subtables,
        })
    }

    fn single(&self, subtable: &SingleSubst<'_>) -> Result<SubtableRecord> {
        let mapping = match subtable {
            SingleSubst::Format1(fmt) => {
                let delta = fmt.delta_glyph_id() as i32;
                fmt.coverage()?
                    .iter()
                    .map(|gid| {
                        let old = gid.to_u32() as u16;
                        let new = ((old as i32 + delta) & 0xFFFF) as u16;
                        (self.names.get(old), self.names.get(new))
                    })
                    .collect()
            }
            SingleSubst::Format2(fmt) => fmt
                .coverage()?
                .iter()
                .zip(fmt.substitute_glyph_ids())
                .map(|(gid, new)| (self.names.glyph(gid), self.names.glyph(new.get())))
                .collect(),
        };
        Ok(SubtableRecord::Single { mapping })
    }

    fn multiple(&self, subtable: &MultipleSubstFormat1<'_>) -> Result<SubtableRecord> {
        let mut mapping = BTreeMap::new();
        for (gid, sequence) in subtable.coverage()?.iter().zip(subtable.sequences().iter()) {
            let glyphs = sequence?
                .substitute_glyph_ids()
                .iter()
                .map(|g| self.names.glyph(g.get()))
                .collect();
            mapping.insert(self.names.glyph(gid), glyphs);
        }
        Ok(SubtableRecord::Multiple { mapping })
    }

    fn alternate(&self, subtable: &AlternateSubstFormat1<'_>) -> Result<SubtableRecord> {
        let mut alternates = BTreeMap::new();
        for (gid, set) in subtable
            .coverage()?
            .iter()
            .zip(subtable.alternate_sets().iter())
        {
            let glyphs = set?
                .alternate_glyph_ids()
                .iter()
                .map(|g| self.names.glyph(g.get()))
                .collect();
            alternates.insert(self.names.glyph(gid), glyphs);
        }
        Ok(SubtableRecord::Alternate { alternates })
    }

    fn ligature(&self, subtable: &LigatureSubstFormat1<'_>) -> Result<SubtableRecord> {
        let mut ligatures = BTreeMap::new();
        for (gid, set) in subtable
            .coverage()?
            .iter()
            .zip(subtable.ligature_sets().iter())
        {
            let records = set?
                .ligatures()
                .iter()
                .map(|ligature| -> Result<LigatureRecord> {
                    let ligature = ligature?;
                    Ok(LigatureRecord {
                        components: ligature
                            .component_glyph_ids()
                            .iter()
                            .map(|g| self.names.glyph(g.get()))
                            .collect(),
                        lig_glyph: self.names.glyph(ligature.ligature_glyph()),
                    })
                })
                .collect::<Result<_>>()?;
            ligatures.insert(self.names.glyph(gid), records);
        }
        Ok(SubtableRecord::Ligature { ligatures })
    }

    /// Only format 3 is materialized; other formats keep their format number.
    fn chain_context(&self, subtable: &ChainedSequenceContext<'_>) -> Result<SubtableRecord> {
        let record = match subtable {
            ChainedSequenceContext::Format1(_) => ChainContextRecord {
                format: 1,
                ..Default::default()
            },
            ChainedSequenceContext::Format2(_) => ChainContextRecord {
                format: 2,
                ..Default::default()
            },
            ChainedSequenceContext::Format3(fmt) => ChainContextRecord {
                format: 3,
                backtrack_coverage: self.coverages(fmt.backtrack_coverages().iter())?,
                input_coverage: self.coverages(fmt.input_coverages().iter())?,
                lookahead_coverage: self.coverages(fmt.lookahead_coverages().iter())?,
                subst_lookup_records: fmt
                    .seq_lookup_records()
                    .iter()
                    .map(|r| SubstLookupRecord {
                        sequence_index: r.sequence_index(),
                        lookup_list_index: r.lookup_list_index(),
                    })
                    .collect(),
            },
        };
        Ok(SubtableRecord::ChainContext(record))
    }

    fn coverages<'c>(
        &self,
        coverages: impl Iterator<Item = result::Result<CoverageTable<'c>, ReadError>>,
    ) -> Result<Vec<Coverage>> {
        coverages
            .map(|coverage| {
                Ok(Coverage::Table {
                    glyphs: self.names.coverage(&coverage?),
                })
            })
            .collect()
    }
}

fn read_lang_sys(lang_sys: &layout::LangSys) -> LangSys {
    LangSys {
        feature_indices: lang_sys.feature_indices().iter().map(|i| i.get()).collect(),
    }
}
