//! # Font Feature Decompiler
//!
//! Turn a compiled OpenType GSUB table back into an editable rule model and
//! write it out as feature file syntax.
//!
//! Lookups are decoded into sequences of glyph classes, features are grouped
//! by script and language, and lookups and classes that recur across
//! features are promoted to named definitions.
//!
//! ## Example
//!
//! ```no_run
//! use font_feature_decompiler::{DecompileOptions, decompile_to_fea};
//!
//! let data = std::fs::read("input.ttf").unwrap();
//! let options = DecompileOptions::new().with_removed_glyphs(["a.sc"]);
//! let fea = decompile_to_fea(&data, &options).unwrap();
//! print!("{fea}");
//! ```

mod compress;
mod error;
mod fea;
mod font;
mod glyph_name;
mod glyphs;
mod lookup;
mod records;
mod subtable;
mod table;
mod types;
mod writer;

pub use error::{Error, Result};
pub use fea::FeaWriter;
pub use font::Font;
pub use glyph_name::{GlyphMap, GlyphName, GlyphSet};
pub use glyphs::{Class, ClassMember, ClassReference, Classes, FlatClass, FlatSequence, Sequence};
pub use lookup::{Lookup, LookupFlag, LookupReference, LookupUse};
pub use records::{
    ChainContextRecord, Coverage, FeatureRecord, LangSys, LangSysRecord, LayoutTable,
    LigatureRecord, LookupRecord, ScriptRecord, SubstLookupRecord, SubtableRecord,
};
pub use subtable::{GsubSubtable, Subtable};
pub use table::{Feature, Language, Script, Table};
pub use types::{DecompileOptions, DecompileResult, DecompileStats, TableTag};
pub use writer::{FeatureWriter, LookupWriter, TableWriter};

/// Decompile a layout table of font data.
pub fn decompile(data: &[u8], options: &DecompileOptions) -> Result<DecompileResult> {
    let layout = Font::new(data)?.layout_table(options.table)?;
    decompile_layout(&layout, options)
}

/// Decompile an already materialized layout table.
///
/// Glyphs are removed before compression, while every rule still holds its
/// own classes, so single substitutions lose target and replacement glyphs
/// in lockstep.
pub fn decompile_layout(layout: &LayoutTable, options: &DecompileOptions) -> Result<DecompileResult> {
    let mut table = Table::from_layout(layout, options.table)?;

    if !options.remove_glyphs.is_empty() {
        let names: GlyphSet = options
            .remove_glyphs
            .iter()
            .map(|name| GlyphName::new(name.as_str()))
            .collect();
        table.remove_glyphs(&names);
        if options.cleanup {
            table.cleanup();
        }
    }

    if options.compress {
        table.compress()?;
    }

    if !options.rename_glyphs.is_empty() {
        let mapping: GlyphMap = options
            .rename_glyphs
            .iter()
            .map(|(from, to)| (GlyphName::new(from.as_str()), GlyphName::new(to.as_str())))
            .collect();
        table.rename_glyphs(&mapping);
    }

    let stats = table.stats();
    Ok(DecompileResult { table, stats })
}

/// Decompile font data straight to feature file syntax.
pub fn decompile_to_fea(data: &[u8], options: &DecompileOptions) -> Result<String> {
    let result = decompile(data, options)?;
    let mut writer = FeaWriter::new();
    result.table.write(&mut writer);
    Ok(writer.finish())
}
