//! Identity resolution for one merge pass.
//!
//! The [`NodeRegistry`] records every languoid mentioned by the classification and dialects
//! texts, keyed by [`Glottocode`]. It makes sure all mentions of one identifier agree on name and
//! level, mints identifiers for blank (`[]`) mentions and answers whether a dialects entry points
//! at a language the classification text actually lists.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    codec::{ChainElement, NodeRef, SourceLocation},
    error::LanguoidError,
    properties::{Glottocode, Level, FIRST_MINTED_NUMBER},
    tree::LanguoidTree,
};

/// Which of the two texts a mention came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Classification,
    Dialects,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub level: Level,
    pub source: TextSource,
    pub location: SourceLocation,
}

#[derive(Debug)]
pub struct NodeRegistry<'a> {
    stored: &'a LanguoidTree,
    reserved: BTreeSet<Glottocode>,
    entries: BTreeMap<Glottocode, Registration>,
    blank: BTreeMap<(Option<Glottocode>, String), Glottocode>,
    minted: BTreeSet<Glottocode>,
}

impl<'a> NodeRegistry<'a> {
    /// `reserved` holds every identifier written out explicitly anywhere in the texts, so minting
    /// never hands out an identifier a later line is going to claim.
    pub fn new(stored: &'a LanguoidTree, reserved: BTreeSet<Glottocode>) -> Self {
        NodeRegistry {
            stored,
            reserved,
            entries: BTreeMap::new(),
            blank: BTreeMap::new(),
            minted: BTreeSet::new(),
        }
    }

    pub fn get(&self, id: &Glottocode) -> Option<&Registration> {
        self.entries.get(id)
    }

    pub fn is_mentioned(&self, id: &Glottocode) -> bool {
        self.entries.contains_key(id)
    }

    pub fn minted(&self) -> &BTreeSet<Glottocode> {
        &self.minted
    }

    /// Resolve a chain element to its identifier.
    ///
    /// A blank identifier reuses the languoid of the same name below the same parent, first from
    /// this pass and then from the stored tree, and is minted only if neither exists.
    pub fn resolve(
        &mut self,
        element: &ChainElement,
        level: Level,
        parent: Option<&Glottocode>,
        source: TextSource,
        location: &SourceLocation,
    ) -> Result<Glottocode, LanguoidError> {
        let id = match &element.id {
            NodeRef::Known(id) => id.clone(),
            NodeRef::Isolate => {
                return Err(LanguoidError::Format(format!(
                    "the isolate marker cannot name a languoid ('{element}')"
                ))
                .located(location))
            }
            NodeRef::New => {
                let key = (parent.cloned(), element.name.clone());
                match self.blank.get(&key) {
                    Some(id) => id.clone(),
                    None => {
                        let stored = self
                            .stored
                            .children(parent)
                            .into_iter()
                            .find(|l| {
                                l.name == element.name
                                    && !self.reserved.contains(&l.id)
                                    && !self.entries.contains_key(&l.id)
                            })
                            .map(|l| l.id.clone());
                        let id = match stored {
                            Some(id) => id,
                            None => self.mint(&element.name)?,
                        };
                        self.blank.insert(key, id.clone());
                        id
                    }
                }
            }
        };
        self.register(&id, &element.name, level, source, location)?;
        Ok(id)
    }

    fn register(
        &mut self,
        id: &Glottocode,
        name: &str,
        level: Level,
        source: TextSource,
        location: &SourceLocation,
    ) -> Result<(), LanguoidError> {
        match self.entries.get(id) {
            Some(existing) => {
                if existing.name != name {
                    return Err(LanguoidError::InconsistentName(format!(
                        "{id} is called '{name}' here but '{}' at {}",
                        existing.name, existing.location
                    ))
                    .located(location));
                }
                if existing.level != level {
                    return Err(LanguoidError::InconsistentName(format!(
                        "{name} [{id}] is a {level} here but a {} at {}",
                        existing.level, existing.location
                    ))
                    .located(location));
                }
            }
            None => {
                self.entries.insert(
                    id.clone(),
                    Registration {
                        name: name.to_string(),
                        level,
                        source,
                        location: location.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    fn is_taken(&self, id: &Glottocode) -> bool {
        self.stored.contains(id) || self.reserved.contains(id) || self.entries.contains_key(id)
    }

    fn mint(&mut self, name: &str) -> Result<Glottocode, LanguoidError> {
        let stem = Glottocode::stem_for(name);
        let id = (FIRST_MINTED_NUMBER..=9999)
            .map(|number| Glottocode::from_parts(&stem, number))
            .find(|candidate| !self.is_taken(candidate))
            .ok_or_else(|| {
                LanguoidError::Custom(format!("no free identifier left for stem '{stem}'"))
            })?;
        tracing::debug!("Minted {id} for new languoid '{name}'");
        self.minted.insert(id.clone());
        Ok(id)
    }

    /// A dialects text entry must start at a language the classification text lists under the
    /// same name.
    pub fn check_known_language(
        &self,
        element: &ChainElement,
        location: &SourceLocation,
    ) -> Result<Glottocode, LanguoidError> {
        let Some(id) = element.known_id() else {
            return Err(LanguoidError::UnknownReference(format!(
                "'{element}' must reference a language of the classification text by identifier"
            ))
            .located(location));
        };
        let registration = self
            .entries
            .get(id)
            .filter(|r| r.source == TextSource::Classification)
            .ok_or_else(|| {
                LanguoidError::UnknownReference(format!(
                    "{element} is not listed in the classification text"
                ))
                .located(location)
            })?;
        if registration.level != Level::Language {
            return Err(LanguoidError::InconsistentName(format!(
                "{element} heads a dialects entry but is a {} at {}",
                registration.level, registration.location
            ))
            .located(location));
        }
        if registration.name != element.name {
            return Err(LanguoidError::InconsistentName(format!(
                "{id} is called '{}' here but '{}' at {}",
                element.name, registration.name, registration.location
            ))
            .located(location));
        }
        Ok(id.clone())
    }
}

/// The isolate marker stands for "no family" and so can only ever be a chain of its own.
pub fn check_isolate(elements: &[ChainElement], location: &SourceLocation) -> Result<(), LanguoidError> {
    if elements.len() > 1 && elements.iter().any(|e| e.is_isolate()) {
        let chain = elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(LanguoidError::IsolateConflict(format!(
            "an isolate cannot have further ancestors: '{chain}'"
        ))
        .located(location));
    }
    Ok(())
}

/// Names must differ among the children of one parent.
pub fn check_duplicate_siblings<'n, I>(
    parent: &str,
    names: I,
    location: Option<&SourceLocation>,
) -> Result<(), LanguoidError>
where
    I: IntoIterator<Item = &'n str>,
{
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            let err = LanguoidError::DuplicateName(format!(
                "'{name}' occurs more than once below {parent}"
            ));
            return Err(match location {
                Some(location) => err.located(location),
                None => err,
            });
        }
    }
    Ok(())
}

/// Names must differ along one line of descent as written in a single entry.
pub fn check_lineage(names: &[&str], location: &SourceLocation) -> Result<(), LanguoidError> {
    if let Some((last, ancestors)) = names.split_last() {
        if ancestors.contains(last) {
            return Err(LanguoidError::DuplicateName(format!(
                "'{last}' repeats the name of one of its ancestors ({})",
                ancestors.join("; ")
            ))
            .located(location));
        }
    }
    Ok(())
}
