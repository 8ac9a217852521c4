//! Reader for the classification text (`lff.txt`).
//!
//! ```text
//! Abkhaz-Adyge [abkh1242]; Circassian [circ1239]
//!     Kabardian [kaba1278]kbd
//!         Besleney []
//! Isolate [-isolate-]
//!     Basque [basq1248]eus
//! ```
//!
//! A top-level line is the family path of the languages indented one unit below it. Lines
//! indented two units are shallow dialects directly attached to the language above them.

use crate::{
    codec::chain::{parse_outlines, Chain, ChainElement, Outline, SourceLocation},
    error::LanguoidError,
};

pub const CLASSIFICATION_SOURCE: &str = "lff.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationLanguage {
    pub element: ChainElement,
    pub location: SourceLocation,
    pub dialects: Vec<(ChainElement, SourceLocation)>,
}

/// One family path line and the languages listed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationBlock {
    pub path: Chain,
    pub location: SourceLocation,
    pub languages: Vec<ClassificationLanguage>,
}

impl ClassificationBlock {
    /// True when the path is the bare isolate marker.
    pub fn is_isolate(&self) -> bool {
        self.path.len() == 1 && self.path[0].is_isolate()
    }
}

pub fn read_classification(
    text: &str,
    source: &str,
) -> Result<Vec<ClassificationBlock>, LanguoidError> {
    parse_outlines(text, source)?
        .into_iter()
        .map(block_from_outline)
        .collect()
}

fn block_from_outline(outline: Outline) -> Result<ClassificationBlock, LanguoidError> {
    let mut languages = Vec::with_capacity(outline.children.len());
    for language in outline.children {
        let mut dialects = Vec::with_capacity(language.children.len());
        for dialect in language.children {
            if let Some(nested) = dialect.children.first() {
                return Err(LanguoidError::Format(
                    "the classification text only lists directly attached dialects, nest deeper in the dialects text".to_string(),
                )
                .located(&nested.location));
            }
            dialects.push((dialect.element, dialect.location));
        }
        languages.push(ClassificationLanguage {
            element: language.element,
            location: language.location,
            dialects,
        });
    }
    Ok(ClassificationBlock {
        path: outline.chain,
        location: outline.location,
        languages,
    })
}
