//! Glyph-set primitives: classes, sequences of classes, and named class maps.

use std::collections::{BTreeMap, HashSet};

use crate::glyph_name::{GlyphMap, GlyphName, GlyphSet};

/// A class flattened for writing: glyph names and `@`-prefixed class names.
pub type FlatClass = Vec<String>;

/// A sequence flattened for writing.
pub type FlatSequence = Vec<FlatClass>;

/// A pointer to a named class, standing in for its members once class
/// compression has promoted them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassReference {
    pub name: String,
}

impl ClassReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassMember {
    Glyph(GlyphName),
    Reference(ClassReference),
}

impl ClassMember {
    pub fn glyph(&self) -> Option<&GlyphName> {
        match self {
            Self::Glyph(name) => Some(name),
            Self::Reference(_) => None,
        }
    }

    fn flatten(&self) -> String {
        match self {
            Self::Glyph(name) => name.to_string(),
            Self::Reference(reference) => reference.name.clone(),
        }
    }
}

impl From<GlyphName> for ClassMember {
    fn from(name: GlyphName) -> Self {
        Self::Glyph(name)
    }
}

impl From<&str> for ClassMember {
    fn from(name: &str) -> Self {
        Self::Glyph(name.into())
    }
}

/// An ordered set of glyphs.
///
/// Order is significant: member `i` of a target class corresponds to member
/// `i` of the parallel substitution class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Class(Vec<ClassMember>);

impl Class {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_glyphs<I, S>(glyphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<GlyphName>,
    {
        Self(glyphs.into_iter().map(|g| ClassMember::Glyph(g.into())).collect())
    }

    /// A one-member class pointing at a named class.
    pub fn reference(name: impl Into<String>) -> Self {
        Self(vec![ClassMember::Reference(ClassReference::new(name))])
    }

    pub fn push(&mut self, member: impl Into<ClassMember>) {
        self.0.push(member.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClassMember> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassMember> {
        self.0.iter()
    }

    pub fn members(&self) -> &[ClassMember] {
        &self.0
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &GlyphName> {
        self.0.iter().filter_map(ClassMember::glyph)
    }

    pub fn contains_glyph(&self, name: &str) -> bool {
        self.glyphs().any(|g| g.as_str() == name)
    }

    pub fn has_reference(&self) -> bool {
        self.0
            .iter()
            .any(|m| matches!(m, ClassMember::Reference(_)))
    }

    pub fn flatten(&self) -> FlatClass {
        self.0.iter().map(ClassMember::flatten).collect()
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        self.0.retain(|member| match member {
            ClassMember::Glyph(name) => !names.contains(name.as_str()),
            ClassMember::Reference(_) => true,
        });
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for member in &mut self.0 {
            if let ClassMember::Glyph(name) = member
                && let Some(new) = mapping.get(name.as_str())
            {
                *name = new.clone();
            }
        }
    }

    /// Remove the members at the given positions.
    pub(crate) fn remove_positions(&mut self, positions: &HashSet<usize>) {
        let mut index = 0;
        self.0.retain(|_| {
            let keep = !positions.contains(&index);
            index += 1;
            keep
        });
    }

    /// Positions of glyph members that are in `names`.
    pub(crate) fn positions_of(&self, names: &GlyphSet) -> HashSet<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, m)| m.glyph().is_some_and(|g| names.contains(g.as_str())))
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop references to classes that no longer exist.
    pub fn prune_references(&mut self, dead: &HashSet<String>) {
        self.0.retain(|member| match member {
            ClassMember::Reference(reference) => !dead.contains(&reference.name),
            ClassMember::Glyph(_) => true,
        });
    }
}

impl<M: Into<ClassMember>> FromIterator<M> for Class {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// An ordered sequence of classes, one per glyph position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence(Vec<Class>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, class: Class) {
        self.0.push(class);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Class> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Class> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Class> {
        self.0.iter_mut()
    }

    pub fn classes(&self) -> &[Class] {
        &self.0
    }

    pub fn has_empty_class(&self) -> bool {
        self.0.iter().any(Class::is_empty)
    }

    pub fn flatten(&self) -> FlatSequence {
        self.0.iter().map(Class::flatten).collect()
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        for class in &mut self.0 {
            class.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for class in &mut self.0 {
            class.rename_glyphs(mapping);
        }
    }

    pub fn prune_references(&mut self, dead: &HashSet<String>) {
        for class in &mut self.0 {
            class.prune_references(dead);
        }
    }

    /// Drop classes left empty by a removal.
    pub fn cleanup(&mut self) {
        self.0.retain(|class| !class.is_empty());
    }
}

impl From<Vec<Class>> for Sequence {
    fn from(classes: Vec<Class>) -> Self {
        Self(classes)
    }
}

impl FromIterator<Class> for Sequence {
    fn from_iter<I: IntoIterator<Item = Class>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Named classes in one scope, kept in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classes(BTreeMap<String, Class>);

impl Classes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, class: Class) {
        self.0.insert(name.into(), class);
    }

    pub fn get(&self, name: &str) -> Option<&Class> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Class)> {
        self.0.iter().map(|(name, class)| (name.as_str(), class))
    }

    pub fn remove_glyphs(&mut self, names: &GlyphSet) {
        for class in self.0.values_mut() {
            class.remove_glyphs(names);
        }
    }

    pub fn rename_glyphs(&mut self, mapping: &GlyphMap) {
        for class in self.0.values_mut() {
            class.rename_glyphs(mapping);
        }
    }

    /// Drop empty classes, returning the names that were removed.
    pub fn cleanup(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .0
            .iter()
            .filter(|(_, class)| class.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &empty {
            self.0.remove(name);
        }
        empty
    }
}
