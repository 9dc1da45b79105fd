//! Lookup compression: table-global promotion, feature-scoped naming and
//! default-lookup hoisting.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info};
use read_fonts::types::Tag;

use super::{base_name, unique_name};
use crate::{
    Result,
    error::Error,
    lookup::{Lookup, LookupUse},
    table::{DFLT, Feature, Language, Table},
};

impl Table {
    /// Promote lookups used by more than one feature to named table-global
    /// lookups, then compress each feature on its own.
    pub fn compress_lookups(&mut self) -> Result<()> {
        let mut candidates: IndexMap<Lookup, BTreeSet<Tag>> = IndexMap::new();
        for feature in &self.features {
            for lookup in feature.inline_lookups() {
                candidates
                    .entry(lookup.clone())
                    .or_default()
                    .insert(feature.tag);
            }
        }

        let mut used: HashSet<String> = self
            .lookups
            .iter()
            .filter_map(|lookup| lookup.name.clone())
            .collect();
        let mut promoted: HashMap<Lookup, String> = HashMap::new();
        for (lookup, features) in candidates {
            if features.len() < 2 {
                continue;
            }
            let name = unique_name(&base_name(&features), &mut used);
            debug!("Promoting lookup shared by {features:?} as {name}");
            promoted.insert(lookup, name);
        }

        if !promoted.is_empty() {
            info!("Promoted {} shared lookups", promoted.len());
            for feature in &mut self.features {
                feature.reference_lookups(&promoted);
            }
            self.lookups.extend(
                promoted
                    .into_iter()
                    .map(|(lookup, name)| lookup.with_name(name)),
            );
            self.lookups.sort_by(|a, b| a.name.cmp(&b.name));
        }

        for feature in &mut self.features {
            feature.compress_lookups()?;
        }
        Ok(())
    }
}

impl Feature {
    /// Name this feature's inline lookups, then hoist default lookup prefixes.
    pub fn compress_lookups(&mut self) -> Result<()> {
        self.name_lookups();
        self.hoist_default_lookups()
    }

    fn reference_lookups(&mut self, promoted: &HashMap<Lookup, String>) {
        for language in self.languages_mut() {
            for lookup_use in &mut language.lookups {
                let name = match lookup_use {
                    LookupUse::Inline(lookup) => promoted.get(&*lookup).cloned(),
                    LookupUse::Reference(_) => None,
                };
                if let Some(name) = name {
                    *lookup_use = LookupUse::reference(name);
                }
            }
        }
    }

    /// Give every distinct inline lookup a `<tag>_<n>` name. The first
    /// occurrence stays inline and later ones refer to it.
    fn name_lookups(&mut self) {
        let prefix = base_name([&self.tag]);
        let mut used: HashSet<String> = self
            .inline_lookups()
            .filter_map(|lookup| lookup.name.clone())
            .collect();
        let mut names: HashMap<Lookup, String> = HashMap::new();
        for lookup in self.inline_lookups() {
            if names.contains_key(lookup) {
                continue;
            }
            let name = match &lookup.name {
                Some(name) => name.clone(),
                None => unique_name(&prefix, &mut used),
            };
            names.insert(lookup.clone(), name);
        }

        let mut seen: HashSet<String> = HashSet::new();
        for language in self.languages_mut() {
            for lookup_use in &mut language.lookups {
                let LookupUse::Inline(lookup) = lookup_use else {
                    continue;
                };
                let Some(name) = names.get(&*lookup).cloned() else {
                    continue;
                };
                if seen.insert(name.clone()) {
                    lookup.name = Some(name);
                } else {
                    *lookup_use = LookupUse::reference(name);
                }
            }
        }
    }

    /// Strip default lookups from the front of the lists that repeat them.
    ///
    /// A script's default language drops the longest prefix it shares with
    /// the global default. A named language whose list starts with the whole
    /// effective default (the global default, then its script's remaining
    /// default lookups) keeps only the rest and inherits the default. Any
    /// other language is marked as excluding the default and keeps its full
    /// list.
    fn hoist_default_lookups(&mut self) -> Result<()> {
        if self.defaults_hoisted {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for script in &self.scripts {
            for language in &script.languages {
                if seen.insert((script.tag, language.tag)) {
                    continue;
                }
                let script_name = script.tag.unwrap_or(DFLT).to_string();
                return Err(match language.tag {
                    None => Error::DuplicateDefaultLanguage(script_name),
                    Some(tag) => Error::DuplicateLanguage {
                        script: script_name,
                        language: tag.to_string(),
                    },
                });
            }
        }

        let global: Vec<Option<String>> = self
            .script(None)
            .and_then(|script| script.language(None))
            .map(owned_names)
            .unwrap_or_default();

        let mut residuals: HashMap<Tag, Vec<Option<String>>> = HashMap::new();
        for script in &mut self.scripts {
            let Some(script_tag) = script.tag else {
                continue;
            };
            if let Some(language) = script.languages.iter_mut().find(|l| l.tag.is_none()) {
                language.strip_shared_prefix(&global);
                residuals.insert(script_tag, owned_names(language));
            }
        }

        for script in &mut self.scripts {
            let mut default = global.clone();
            if let Some(residual) = script.tag.and_then(|tag| residuals.get(&tag)) {
                default.extend(residual.iter().cloned());
            }
            for language in script.languages.iter_mut().filter(|l| l.tag.is_some()) {
                language.strip_default(&default);
            }
        }

        self.defaults_hoisted = true;
        Ok(())
    }
}

fn owned_names(language: &Language) -> Vec<Option<String>> {
    language
        .lookup_names()
        .into_iter()
        .map(|name| name.map(str::to_owned))
        .collect()
}

impl Language {
    /// Drop the lookups this list shares with the start of `default`.
    fn strip_shared_prefix(&mut self, default: &[Option<String>]) {
        let shared = self
            .lookup_names()
            .iter()
            .zip(default)
            .take_while(|(name, other)| **name == other.as_deref())
            .count();
        self.lookups.drain(..shared);
        self.include_default = true;
    }

    fn strip_default(&mut self, default: &[Option<String>]) {
        let names = owned_names(self);
        if names.starts_with(default) {
            self.lookups = self.lookups.split_off(default.len());
            self.include_default = true;
        } else {
            self.include_default = false;
        }
    }
}
