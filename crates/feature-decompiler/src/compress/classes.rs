//! Class compression: name glyph classes that recur across rules.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use log::info;
use read_fonts::types::Tag;

use super::{base_name, unique_name};
use crate::{
    glyphs::{Class, Classes},
    lookup::{Lookup, LookupUse},
    table::Table,
};

impl Table {
    /// Replace every class of more than one member with a reference to a
    /// named class. Classes used by several features are defined on the
    /// table, the rest on the one feature that uses them.
    ///
    /// Shared lookups count as used by every feature that refers to them.
    pub fn compress_classes(&mut self) {
        let candidates = self.class_candidates();

        let mut used: HashSet<String> = self
            .classes
            .iter()
            .map(|(name, _)| name.to_owned())
            .chain(
                self.features
                    .iter()
                    .flat_map(|feature| feature.classes.iter().map(|(name, _)| name.to_owned())),
            )
            .collect();
        let mut names: HashMap<Class, String> = HashMap::new();
        let mut local: HashMap<Tag, Classes> = HashMap::new();
        for (class, features) in candidates {
            let name = unique_name(&format!("@{}", base_name(&features)), &mut used);
            match features.first() {
                Some(&tag) if features.len() == 1 => {
                    local.entry(tag).or_default().insert(name.clone(), class.clone())
                }
                _ => self.classes.insert(name.clone(), class.clone()),
            }
            names.insert(class, name);
        }
        if names.is_empty() {
            return;
        }

        info!(
            "Promoted {} classes, {} shared",
            names.len(),
            names.len() - local.values().map(Classes::len).sum::<usize>()
        );
        for lookup in &mut self.lookups {
            lookup.populate_classes(&names);
        }
        for feature in &mut self.features {
            if let Some(classes) = local.remove(&feature.tag) {
                for (name, class) in classes.iter() {
                    feature.classes.insert(name, class.clone());
                }
            }
            for lookup in feature.inline_lookups_mut() {
                lookup.populate_classes(&names);
            }
        }
    }

    /// Multi-member classes in first-seen order, with the features using them.
    fn class_candidates(&self) -> IndexMap<Class, BTreeSet<Tag>> {
        let shared: HashMap<&str, &Lookup> = self
            .lookups
            .iter()
            .filter_map(|lookup| lookup.name.as_deref().map(|name| (name, lookup)))
            .collect();

        let mut candidates: IndexMap<Class, BTreeSet<Tag>> = IndexMap::new();
        for feature in &self.features {
            for lookup_use in feature.lookup_uses() {
                let lookup = match lookup_use {
                    LookupUse::Inline(lookup) => lookup,
                    LookupUse::Reference(reference) => match shared.get(reference.name.as_str()) {
                        Some(lookup) => lookup,
                        // Feature-scoped: its inline first use is scanned.
                        None => continue,
                    },
                };
                for class in lookup.potential_classes() {
                    candidates
                        .entry(class.clone())
                        .or_default()
                        .insert(feature.tag);
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        glyphs::Sequence,
        lookup::LookupFlag,
        subtable::{GsubSubtable, Subtable},
        table::{Feature, Language, Script},
    };

    fn tag(s: &str) -> Tag {
        Tag::new_checked(s.as_bytes()).unwrap()
    }

    fn lookup(target: &[&str], substitution: &[&str]) -> Lookup {
        let mut subtable = GsubSubtable::new(1);
        subtable
            .target
            .push(Sequence::from(vec![Class::from_glyphs(target.iter().copied())]));
        subtable
            .substitution
            .push(Sequence::from(vec![Class::from_glyphs(substitution.iter().copied())]));
        let mut lookup = Lookup::new(1, LookupFlag::default());
        lookup.subtables.push(Subtable::Gsub(subtable));
        lookup
    }

    fn feature(feature_tag: &str, lookups: Vec<LookupUse>) -> Feature {
        let mut feature = Feature::new(tag(feature_tag));
        let mut script = Script::new(None);
        script.languages.push(Language::new(None).with_lookups(lookups));
        feature.scripts.push(script);
        feature
    }

    fn flat_rules(lookup: &Lookup) -> Vec<Vec<Vec<String>>> {
        lookup
            .gsub_subtables()
            .flat_map(|subtable| subtable.target.iter().chain(&subtable.substitution))
            .map(Sequence::flatten)
            .collect()
    }

    #[test]
    fn test_shared_class_becomes_global() {
        let mut table = Table::default();
        table.features.push(feature(
            "smcp",
            vec![LookupUse::Inline(lookup(&["a", "b"], &["a.sc", "b.sc"]))],
        ));
        table.features.push(feature(
            "c2sc",
            vec![LookupUse::Inline(lookup(&["a", "b"], &["a.c2", "b.c2"]))],
        ));
        table.compress_classes();

        assert_eq!(table.classes.len(), 1);
        assert_eq!(
            table.classes.get("@c2sc_smcp_1"),
            Some(&Class::from_glyphs(["a", "b"]))
        );
        let smcp = &table.features[0];
        assert_eq!(smcp.classes.len(), 1);
        assert_eq!(
            smcp.classes.get("@smcp_1"),
            Some(&Class::from_glyphs(["a.sc", "b.sc"]))
        );
        let rules = flat_rules(smcp.inline_lookups().next().unwrap());
        assert_eq!(rules, vec![vec![vec!["@c2sc_smcp_1"]], vec![vec!["@smcp_1"]]]);
    }

    #[test]
    fn test_classes_in_shared_lookups_count_every_user() {
        let mut table = Table::default();
        table
            .lookups
            .push(lookup(&["f", "l"], &["f.alt", "l.alt"]).with_name("liga_rlig_1"));
        table
            .features
            .push(feature("liga", vec![LookupUse::reference("liga_rlig_1")]));
        table
            .features
            .push(feature("rlig", vec![LookupUse::reference("liga_rlig_1")]));
        table.compress_classes();

        let names: Vec<&str> = table.classes.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["@liga_rlig_1", "@liga_rlig_2"]);
        assert!(table.features.iter().all(|f| f.classes.is_empty()));
        assert_eq!(
            flat_rules(&table.lookups[0]),
            vec![vec![vec!["@liga_rlig_1"]], vec![vec!["@liga_rlig_2"]]]
        );
    }

    #[test]
    fn test_single_glyph_classes_stay_inline() {
        let mut table = Table::default();
        table
            .features
            .push(feature("smcp", vec![LookupUse::Inline(lookup(&["a"], &["a.sc"]))]));
        let before = table.clone();
        table.compress_classes();
        assert_eq!(table, before);
    }

    #[test]
    fn test_alternates_are_not_promoted() {
        let mut subtable = GsubSubtable::new(3);
        subtable
            .target
            .push(Sequence::from(vec![Class::from_glyphs(["a"])]));
        subtable
            .substitution
            .push(Sequence::from(vec![Class::from_glyphs(["a.1", "a.2"])]));
        let mut alternates = Lookup::new(3, LookupFlag::default());
        alternates.subtables.push(Subtable::Gsub(subtable));

        let mut table = Table::default();
        table
            .features
            .push(feature("aalt", vec![LookupUse::Inline(alternates)]));
        table.compress_classes();
        assert!(table.features[0].classes.is_empty());
        assert!(table.classes.is_empty());
    }
}
