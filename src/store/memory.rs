use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::LanguoidError,
    properties::{ExternalCode, Glottocode, NodeAttrs},
    store::NodeStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    parent: Option<Glottocode>,
    attrs: NodeAttrs,
}

/// A [`NodeStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Glottocode, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parent(&self, id: &Glottocode) -> Option<&Glottocode> {
        self.entries.get(id).and_then(|e| e.parent.as_ref())
    }

    fn check_parent(&self, parent: Option<&Glottocode>) -> Result<(), LanguoidError> {
        match parent {
            Some(parent) if !self.entries.contains_key(parent) => {
                Err(LanguoidError::NotFound(format!("parent languoid {parent}")))
            }
            _ => Ok(()),
        }
    }

    fn is_within(&self, id: &Glottocode, ancestor: &Glottocode) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }
}

impl NodeStore for MemoryStore {
    fn create(
        &mut self,
        parent: Option<&Glottocode>,
        id: &Glottocode,
        attrs: &NodeAttrs,
    ) -> Result<(), LanguoidError> {
        if self.entries.contains_key(id) {
            return Err(LanguoidError::Custom(format!("languoid {id} already exists")));
        }
        self.check_parent(parent)?;
        self.entries.insert(
            id.clone(),
            Entry {
                parent: parent.cloned(),
                attrs: attrs.clone(),
            },
        );
        Ok(())
    }

    fn read(&self, id: &Glottocode) -> Result<Option<NodeAttrs>, LanguoidError> {
        Ok(self.entries.get(id).map(|e| e.attrs.clone()))
    }

    fn update(&mut self, id: &Glottocode, attrs: &NodeAttrs) -> Result<(), LanguoidError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        entry.attrs = attrs.clone();
        Ok(())
    }

    fn move_node(
        &mut self,
        id: &Glottocode,
        parent: Option<&Glottocode>,
    ) -> Result<(), LanguoidError> {
        self.check_parent(parent)?;
        if let Some(parent) = parent {
            if self.is_within(parent, id) {
                return Err(LanguoidError::Custom(format!(
                    "cannot move {id} below its own descendant {parent}"
                )));
            }
        }
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        entry.parent = parent.cloned();
        Ok(())
    }

    fn delete(&mut self, id: &Glottocode) -> Result<(), LanguoidError> {
        if !self.entries.contains_key(id) {
            return Err(LanguoidError::NotFound(format!("languoid {id}")));
        }
        let doomed = self
            .entries
            .keys()
            .filter(|candidate| self.is_within(candidate, id))
            .cloned()
            .collect::<Vec<Glottocode>>();
        for id in doomed {
            self.entries.remove(&id);
        }
        Ok(())
    }

    fn list_children(&self, parent: Option<&Glottocode>) -> Result<Vec<Glottocode>, LanguoidError> {
        Ok(self
            .entries
            .iter()
            .filter(|(_, e)| e.parent.as_ref() == parent)
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn lookup_by_code(&self, code: &ExternalCode) -> Result<Option<Glottocode>, LanguoidError> {
        Ok(self
            .entries
            .iter()
            .find(|(_, e)| e.attrs.code.as_ref() == Some(code))
            .map(|(id, _)| id.clone()))
    }

    fn all_identifiers(&self) -> Result<BTreeSet<Glottocode>, LanguoidError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
