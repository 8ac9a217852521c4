//! Regenerates the classification and dialects texts from a [`LanguoidTree`].
//!
//! Output is deterministic (children ordered by name, then identifier) and carries every
//! identifier and external code, so re-reading it into the same tree changes nothing.

use std::fmt::Write;

use crate::{
    codec::chain::INDENT,
    error::LanguoidError,
    properties::{Languoid, Level, ISOLATE_MARKER},
    tree::LanguoidTree,
};

pub const CODING_HEADER: &str = "# -*- coding: utf-8 -*-";

/// Display name of the pseudo-family that root-level languages are listed under.
pub const ISOLATE_NAME: &str = "Isolate";

pub fn write_classification(tree: &LanguoidTree) -> Result<String, LanguoidError> {
    let mut out = String::new();
    writeln!(out, "{CODING_HEADER}")?;
    let mut isolates = Vec::new();
    for node in tree.depth_first() {
        match node.level {
            Level::Family => {
                let children = tree.sorted_children(Some(&node.id));
                let languages = children
                    .iter()
                    .filter(|c| c.level == Level::Language)
                    .collect::<Vec<_>>();
                // Families with only subgroups show up in their descendants' paths.
                if languages.is_empty() && !children.is_empty() {
                    continue;
                }
                let path = tree
                    .ancestors(&node.id)
                    .into_iter()
                    .chain(std::iter::once(node))
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                writeln!(out, "{path}")?;
                for language in languages {
                    write_language(&mut out, tree, language)?;
                }
            }
            Level::Language if node.parent.is_none() => isolates.push(node),
            _ => {}
        }
    }
    if !isolates.is_empty() {
        writeln!(out, "{ISOLATE_NAME} [{ISOLATE_MARKER}]")?;
        for language in isolates {
            write_language(&mut out, tree, language)?;
        }
    }
    Ok(out)
}

fn write_language(
    out: &mut String,
    tree: &LanguoidTree,
    language: &Languoid,
) -> Result<(), LanguoidError> {
    writeln!(out, "{INDENT}{language}")?;
    for dialect in tree.sorted_children(Some(&language.id)) {
        writeln!(out, "{INDENT}{INDENT}{dialect}")?;
    }
    Ok(())
}

pub fn write_dialects(tree: &LanguoidTree) -> Result<String, LanguoidError> {
    let mut out = String::new();
    writeln!(out, "{CODING_HEADER}")?;
    for language in tree
        .depth_first()
        .into_iter()
        .filter(|l| l.level == Level::Language && tree.has_children(&l.id))
    {
        writeln!(out, "{language}")?;
        let base = tree.depth(&language.id);
        for dialect in tree.descendants(&language.id) {
            let depth = tree.depth(&dialect.id) - base;
            writeln!(out, "{}{dialect}", INDENT.repeat(depth))?;
        }
    }
    Ok(out)
}
