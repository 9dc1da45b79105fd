//! Compression passes: promote lookups and classes that recur across the
//! table to named definitions.

mod classes;
mod lookups;

use std::collections::{BTreeSet, HashSet};

use read_fonts::types::Tag;

/// The sorted feature tags joined by `_`, e.g. `liga_rlig`.
fn base_name<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> String {
    let tags: BTreeSet<&Tag> = tags.into_iter().collect();
    tags.into_iter()
        .map(|tag| tag.to_string().trim_end().to_owned())
        .collect::<Vec<_>>()
        .join("_")
}

/// `base_1`, `base_2`, ...: the first one not in `used`, which is then marked
/// as used.
fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    let mut counter = 1;
    loop {
        let name = format!("{base}_{counter}");
        if used.insert(name.clone()) {
            return name;
        }
        counter += 1;
    }
}
