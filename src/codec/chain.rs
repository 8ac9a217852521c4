//! Line level parsing shared by the classification and dialects texts.
//!
//! Both texts are outlines: a top-level line holds a `;`-separated chain of elements, and lines
//! indented by [INDENT] per depth hang below it. Each element reads `Name [identifier]code`, where
//! the identifier may be blank (`[]`, a new languoid) or the [ISOLATE_MARKER], and the external
//! code is optional.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

use crate::{
    error::LanguoidError,
    properties::{ExternalCode, Glottocode, ISOLATE_MARKER},
};

/// One indentation unit.
pub const INDENT: &str = "    ";

static ELEMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^\[\];]+?)\s*\[(?P<id>[^\[\];]*)\]\s*(?P<code>[^\s\[\];]*)$")
        .expect("static pattern")
});

/// Where a parsed line came from: a source label (usually the file name) and a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    pub source: String,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(source: &str, line: usize) -> Self {
        SourceLocation {
            source: source.to_string(),
            line,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// Content of the bracketed identifier slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// `[]`: a languoid that still needs an identifier.
    New,
    Known(Glottocode),
    /// `[-isolate-]`: the pseudo-family of languages without family.
    Isolate,
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::New => Ok(()),
            NodeRef::Known(id) => write!(f, "{id}"),
            NodeRef::Isolate => write!(f, "{ISOLATE_MARKER}"),
        }
    }
}

/// One `(name, identifier-or-blank, externalCode-or-blank)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainElement {
    pub name: String,
    pub id: NodeRef,
    pub code: Option<ExternalCode>,
}

impl ChainElement {
    pub fn is_isolate(&self) -> bool {
        self.id == NodeRef::Isolate
    }

    pub fn known_id(&self) -> Option<&Glottocode> {
        match &self.id {
            NodeRef::Known(id) => Some(id),
            _ => None,
        }
    }
}

impl Display for ChainElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)?;
        if let Some(code) = &self.code {
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

pub type Chain = Vec<ChainElement>;

pub fn parse_element(text: &str, location: &SourceLocation) -> Result<ChainElement, LanguoidError> {
    let caps = ELEMENT_PATTERN.captures(text.trim()).ok_or_else(|| {
        LanguoidError::Format(format!("expected 'Name [identifier]code', got '{text}'"))
            .located(location)
    })?;
    let name = caps["name"].trim().to_string();
    let id = match caps["id"].trim() {
        "" => NodeRef::New,
        ISOLATE_MARKER => NodeRef::Isolate,
        raw => NodeRef::Known(Glottocode::try_from(raw).map_err(|e| e.located(location))?),
    };
    let code = match &caps["code"] {
        "" => None,
        raw => Some(ExternalCode::try_from(raw).map_err(|e| e.located(location))?),
    };
    Ok(ChainElement { name, id, code })
}

pub fn parse_chain(text: &str, location: &SourceLocation) -> Result<Chain, LanguoidError> {
    text.split(';')
        .map(|part| {
            if part.trim().is_empty() {
                Err(LanguoidError::Format(format!("empty chain element in '{text}'")).located(location))
            } else {
                parse_element(part, location)
            }
        })
        .collect()
}

/// A non-blank, non-comment line with its indentation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentedLine {
    pub depth: usize,
    pub content: String,
    pub location: SourceLocation,
}

/// Split a text into content lines, dropping blank lines and `#` comments.
///
/// Indentation must be a whole number of [INDENT] units made of spaces.
pub fn content_lines(text: &str, source: &str) -> Result<Vec<IndentedLine>, LanguoidError> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let location = SourceLocation::new(source, index + 1);
        let line = raw.trim_end().trim_start_matches('\u{feff}');
        let content = line.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = &line[..line.len() - content.len()];
        if !indent.bytes().all(|b| b == b' ') || indent.len() % INDENT.len() != 0 {
            return Err(LanguoidError::Format(format!(
                "inconsistent indentation, expected multiples of {} spaces",
                INDENT.len()
            ))
            .located(&location));
        }
        lines.push(IndentedLine {
            depth: indent.len() / INDENT.len(),
            content: content.to_string(),
            location,
        });
    }
    Ok(lines)
}

/// An element nested below a chain line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub element: ChainElement,
    pub location: SourceLocation,
    pub children: Vec<OutlineNode>,
}

/// A top-level chain line together with everything indented below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub chain: Chain,
    pub location: SourceLocation,
    pub children: Vec<OutlineNode>,
}

/// Parse a whole text into outlines.
///
/// Depth may grow by one unit per line at most. An indented line before the first top-level line,
/// or two units deep with nothing one unit deep above it, has no context to attach to.
pub fn parse_outlines(text: &str, source: &str) -> Result<Vec<Outline>, LanguoidError> {
    let mut outlines: Vec<Outline> = Vec::new();
    // Path of child indices from the current outline down to the most recent node.
    let mut open: Vec<usize> = Vec::new();
    for line in content_lines(text, source)? {
        if line.depth == 0 {
            outlines.push(Outline {
                chain: parse_chain(&line.content, &line.location)?,
                location: line.location,
                children: Vec::new(),
            });
            open.clear();
            continue;
        }
        let Some(outline) = outlines.last_mut() else {
            return Err(LanguoidError::ClassificationContext(format!(
                "indented entry '{}' precedes any classification line",
                line.content
            ))
            .located(&line.location));
        };
        if open.is_empty() && line.depth > 1 {
            return Err(LanguoidError::ClassificationContext(format!(
                "'{}' has no enclosing entry one level up",
                line.content
            ))
            .located(&line.location));
        }
        if line.depth > open.len() + 1 {
            return Err(LanguoidError::Format(format!(
                "inconsistent indentation, depth jumps from {} to {}",
                open.len(),
                line.depth
            ))
            .located(&line.location));
        }
        if line.content.contains(';') {
            return Err(LanguoidError::Format(format!(
                "indented entries hold a single element, got '{}'",
                line.content
            ))
            .located(&line.location));
        }
        let node = OutlineNode {
            element: parse_element(&line.content, &line.location)?,
            location: line.location,
            children: Vec::new(),
        };
        open.truncate(line.depth - 1);
        let mut siblings = &mut outline.children;
        for index in open.iter() {
            siblings = &mut siblings[*index].children;
        }
        open.push(siblings.len());
        siblings.push(node);
    }
    Ok(outlines)
}
