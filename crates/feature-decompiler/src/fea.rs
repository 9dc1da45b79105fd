//! A writer that renders a decompiled table as feature file syntax.

use std::fmt::Write;

use read_fonts::types::Tag;

use crate::{
    glyphs::{FlatClass, FlatSequence},
    lookup::LookupFlag,
    writer::{FeatureWriter, LookupWriter, TableWriter},
};

const INDENT: &str = "    ";

/// Collects the write calls of a [`Table`](crate::Table) and renders them
/// with [`FeaWriter::finish`].
#[derive(Debug, Default)]
pub struct FeaWriter {
    language_systems: Vec<String>,
    classes: Vec<String>,
    lookups: Vec<FeaLookup>,
    features: Vec<FeaFeature>,
}

impl FeaWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&self) -> String {
        let mut out = String::new();
        for line in &self.language_systems {
            out.push_str(line);
            out.push('\n');
        }
        if !self.language_systems.is_empty() {
            out.push('\n');
        }
        for line in &self.classes {
            out.push_str(line);
            out.push('\n');
        }
        if !self.classes.is_empty() {
            out.push('\n');
        }
        for lookup in &self.lookups {
            lookup.render("", &mut out);
            out.push('\n');
        }
        for feature in &self.features {
            feature.render(&mut out);
            out.push('\n');
        }
        out
    }
}

impl TableWriter for FeaWriter {
    fn add_language_system(&mut self, script: Tag, language: Option<Tag>) {
        self.language_systems.push(format!(
            "languagesystem {} {};",
            tag_text(script),
            language_text(language)
        ));
    }

    fn add_class_definition(&mut self, name: &str, members: &[String]) {
        self.classes.push(class_definition(name, members));
    }

    fn add_lookup(&mut self, name: &str) -> &mut dyn LookupWriter {
        let index = self.lookups.len();
        self.lookups.push(FeaLookup::new(Some(name)));
        &mut self.lookups[index]
    }

    fn add_feature(&mut self, tag: Tag) -> &mut dyn FeatureWriter {
        let index = self.features.len();
        self.features.push(FeaFeature::new(tag));
        &mut self.features[index]
    }
}

#[derive(Debug)]
enum FeatureItem {
    Line(String),
    Lookup(usize),
}

#[derive(Debug)]
pub struct FeaFeature {
    tag: Tag,
    items: Vec<FeatureItem>,
    lookups: Vec<FeaLookup>,
}

impl FeaFeature {
    fn new(tag: Tag) -> Self {
        Self {
            tag,
            items: Vec::new(),
            lookups: Vec::new(),
        }
    }

    fn render(&self, out: &mut String) {
        let tag = tag_text(self.tag);
        let _ = writeln!(out, "feature {tag} {{");
        for item in &self.items {
            match item {
                FeatureItem::Line(line) => {
                    let _ = writeln!(out, "{INDENT}{line}");
                }
                FeatureItem::Lookup(index) => {
                    if let Some(lookup) = self.lookups.get(*index) {
                        lookup.render(INDENT, out);
                    }
                }
            }
        }
        let _ = writeln!(out, "}} {tag};");
    }
}

impl FeatureWriter for FeaFeature {
    fn add_class_definition(&mut self, name: &str, members: &[String]) {
        self.items
            .push(FeatureItem::Line(class_definition(name, members)));
    }

    fn add_script(&mut self, tag: Tag) {
        self.items
            .push(FeatureItem::Line(format!("script {};", tag_text(tag))));
    }

    fn add_language(&mut self, tag: Option<Tag>, include_default: bool) {
        let exclude = if include_default { "" } else { " exclude_dflt" };
        self.items.push(FeatureItem::Line(format!(
            "language {}{exclude};",
            language_text(tag)
        )));
    }

    fn add_lookup(&mut self, name: Option<&str>) -> &mut dyn LookupWriter {
        let index = self.lookups.len();
        self.lookups.push(FeaLookup::new(name));
        self.items.push(FeatureItem::Lookup(index));
        &mut self.lookups[index]
    }

    fn add_lookup_reference(&mut self, name: &str) {
        self.items
            .push(FeatureItem::Line(format!("lookup {name};")));
    }
}

/// One lookup block. Unnamed lookups are rendered as bare rules.
#[derive(Debug)]
pub struct FeaLookup {
    name: Option<String>,
    flag: Option<String>,
    statements: Vec<String>,
}

impl FeaLookup {
    fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_owned),
            flag: None,
            statements: Vec::new(),
        }
    }

    fn render(&self, indent: &str, out: &mut String) {
        match &self.name {
            Some(name) => {
                let _ = writeln!(out, "{indent}lookup {name} {{");
                let inner = format!("{indent}{INDENT}");
                if let Some(flag) = &self.flag {
                    let _ = writeln!(out, "{inner}{flag}");
                }
                for statement in &self.statements {
                    let _ = writeln!(out, "{inner}{statement}");
                }
                let _ = writeln!(out, "{indent}}} {name};");
            }
            None => {
                if let Some(flag) = &self.flag {
                    let _ = writeln!(out, "{indent}{flag}");
                }
                for statement in &self.statements {
                    let _ = writeln!(out, "{indent}{statement}");
                }
                if self.flag.is_some() {
                    let _ = writeln!(out, "{indent}lookupflag 0;");
                }
            }
        }
    }
}

impl LookupWriter for FeaLookup {
    fn add_lookup_flag(&mut self, flag: LookupFlag) {
        if flag.is_empty() {
            return;
        }
        let mut parts = Vec::new();
        if flag.right_to_left {
            parts.push("RightToLeft");
        }
        if flag.ignore_base_glyphs {
            parts.push("IgnoreBaseGlyphs");
        }
        if flag.ignore_ligatures {
            parts.push("IgnoreLigatures");
        }
        if flag.ignore_marks {
            parts.push("IgnoreMarks");
        }
        let mut line = if parts.is_empty() {
            "lookupflag 0;".to_owned()
        } else {
            format!("lookupflag {};", parts.join(" "))
        };
        if flag.mark_attachment_type {
            line.push_str(" # MarkAttachmentType");
        }
        self.flag = Some(line);
    }

    fn add_gsub_subtable(
        &mut self,
        lookup_type: u16,
        target: &[FlatSequence],
        substitution: &[FlatSequence],
        backtrack: &FlatSequence,
        lookahead: &FlatSequence,
    ) {
        let contextual = lookup_type == 6 || !backtrack.is_empty() || !lookahead.is_empty();
        if !self.statements.is_empty() {
            self.statements.push("subtable;".to_owned());
        }
        for (index, target) in target.iter().enumerate() {
            if target.is_empty() {
                continue;
            }
            let mut input: Vec<String> = Vec::new();
            if contextual {
                input.extend(backtrack.iter().map(|class| class_text(class)));
                input.extend(target.iter().map(|class| format!("{}'", class_text(class))));
                input.extend(lookahead.iter().map(|class| class_text(class)));
            } else {
                input.extend(target.iter().map(|class| class_text(class)));
            }
            let input = input.join(" ");

            let statement = match substitution.get(index) {
                Some(replacement) if lookup_type == 3 => {
                    let alternates: Vec<String> = replacement
                        .iter()
                        .map(|class| format!("[{}]", class.join(" ")))
                        .collect();
                    format!("sub {input} from {};", alternates.join(" "))
                }
                Some(replacement) => {
                    let replacement: Vec<String> = replacement.iter().map(|class| class_text(class)).collect();
                    format!("sub {input} by {};", replacement.join(" "))
                }
                None => format!("ignore sub {input};"),
            };
            self.statements.push(statement);
        }
    }
}

fn class_text(class: &FlatClass) -> String {
    match class.as_slice() {
        [single] => single.clone(),
        members => format!("[{}]", members.join(" ")),
    }
}

fn class_definition(name: &str, members: &[String]) -> String {
    format!("{name} = [{}];", members.join(" "))
}

fn tag_text(tag: Tag) -> String {
    tag.to_string().trim_end().to_owned()
}

fn language_text(tag: Option<Tag>) -> String {
    tag.map(tag_text).unwrap_or_else(|| "dflt".to_owned())
}
