//! The in-memory languoid tree.
//!
//! [`LanguoidTree`] is an arena of [`Languoid`] records keyed by [`Glottocode`]. Parent links live
//! on the records, the child index and the external-code index are maintained by the tree, so all
//! mutations go through its methods. A merge pass works on a private clone of the stored tree and
//! only the diff between the two ever reaches the storage backend (see [`crate::materialize`]).

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::LanguoidError,
    properties::{ExternalCode, Glottocode, Languoid, Level},
    store::NodeStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguoidTree {
    nodes: BTreeMap<Glottocode, Languoid>,
    children: BTreeMap<Option<Glottocode>, BTreeSet<Glottocode>>,
    codes: BTreeMap<ExternalCode, Glottocode>,
}

impl LanguoidTree {
    pub fn empty() -> Self {
        LanguoidTree::default()
    }

    /// Read the complete tree out of a storage backend, parents before children.
    pub fn load<S: NodeStore + ?Sized>(store: &S) -> Result<Self, LanguoidError> {
        let mut tree = LanguoidTree::empty();
        let mut queue = store
            .list_children(None)?
            .into_iter()
            .map(|id| (None, id))
            .collect::<Vec<(Option<Glottocode>, Glottocode)>>();
        while let Some((parent, id)) = queue.pop() {
            let attrs = store
                .read(&id)?
                .ok_or_else(|| LanguoidError::NotFound(format!("stored languoid {id}")))?;
            for child in store.list_children(Some(&id))? {
                queue.push((Some(id.clone()), child));
            }
            tree.insert(Languoid::from_attrs(id, parent, attrs))?;
        }
        tracing::debug!("Loaded {} languoids from storage", tree.len());
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &Glottocode) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &Glottocode) -> Option<&Languoid> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Languoid> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Glottocode> {
        self.nodes.keys()
    }

    /// Insert a new languoid or replace the record stored under the same identifier.
    ///
    /// The external code of the incoming record is bound exclusively: a different holder loses
    /// it.
    pub fn insert(&mut self, languoid: Languoid) -> Result<(), LanguoidError> {
        let id = languoid.id.clone();
        let code = languoid.code.clone();
        let parent = languoid.parent.clone();
        match self.nodes.get_mut(&id) {
            Some(existing) => {
                existing.name = languoid.name;
                existing.level = languoid.level;
            }
            None => {
                self.nodes.insert(
                    id.clone(),
                    Languoid {
                        code: None,
                        parent: None,
                        ..languoid
                    },
                );
                self.children.entry(None).or_default().insert(id.clone());
            }
        }
        self.set_parent(&id, parent)?;
        self.set_code(&id, code)?;
        Ok(())
    }

    /// Re-link `id` below `parent` (or make it a root).
    pub fn set_parent(
        &mut self,
        id: &Glottocode,
        parent: Option<Glottocode>,
    ) -> Result<(), LanguoidError> {
        if let Some(parent_id) = &parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(LanguoidError::NotFound(format!(
                    "parent {parent_id} of languoid {id}"
                )));
            }
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        let previous = std::mem::replace(&mut node.parent, parent.clone());
        if let Some(siblings) = self.children.get_mut(&previous) {
            siblings.remove(id);
            if siblings.is_empty() {
                self.children.remove(&previous);
            }
        }
        self.children.entry(parent).or_default().insert(id.clone());
        Ok(())
    }

    pub fn set_name(&mut self, id: &Glottocode, name: &str) -> Result<(), LanguoidError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        node.name = name.to_string();
        Ok(())
    }

    pub fn set_level(&mut self, id: &Glottocode, level: Level) -> Result<(), LanguoidError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        node.level = level;
        Ok(())
    }

    /// Bind `code` to `id`, or clear the code of `id` when `code` is `None`.
    ///
    /// Returns the identifier of the languoid the code was revoked from, if another languoid held
    /// it before.
    pub fn set_code(
        &mut self,
        id: &Glottocode,
        code: Option<ExternalCode>,
    ) -> Result<Option<Glottocode>, LanguoidError> {
        let previous_code = self
            .nodes
            .get(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?
            .code
            .clone();
        if previous_code == code {
            return Ok(None);
        }
        if let Some(previous_code) = previous_code {
            self.codes.remove(&previous_code);
        }
        let mut revoked = None;
        if let Some(code) = &code {
            if let Some(holder) = self.codes.insert(code.clone(), id.clone()) {
                if let Some(holder_node) = self.nodes.get_mut(&holder) {
                    holder_node.code = None;
                }
                revoked = Some(holder);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.code = code;
        }
        Ok(revoked)
    }

    /// Remove a childless languoid.
    pub fn remove(&mut self, id: &Glottocode) -> Result<Languoid, LanguoidError> {
        if self.has_children(id) {
            return Err(LanguoidError::Custom(format!(
                "cannot remove languoid {id} while it still has children"
            )));
        }
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("languoid {id}")))?;
        if let Some(siblings) = self.children.get_mut(&node.parent) {
            siblings.remove(id);
            if siblings.is_empty() {
                self.children.remove(&node.parent);
            }
        }
        if let Some(code) = &node.code {
            self.codes.remove(code);
        }
        Ok(node)
    }

    pub fn has_children(&self, id: &Glottocode) -> bool {
        self.children
            .get(&Some(id.clone()))
            .is_some_and(|c| !c.is_empty())
    }

    /// Children of `parent` (roots for `None`) in identifier order.
    pub fn children(&self, parent: Option<&Glottocode>) -> Vec<&Languoid> {
        self.children
            .get(&parent.cloned())
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Children of `parent` ordered the way they are serialized: by name, then identifier.
    pub fn sorted_children(&self, parent: Option<&Glottocode>) -> Vec<&Languoid> {
        let mut children = self.children(parent);
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        children
    }

    pub fn roots(&self) -> Vec<&Languoid> {
        self.children(None)
    }

    /// Ancestors of `id`, root first, excluding `id` itself.
    pub fn ancestors(&self, id: &Glottocode) -> Vec<&Languoid> {
        let mut lineage = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent.as_ref());
        while let Some(parent_id) = current {
            match self.nodes.get(parent_id) {
                Some(parent) => {
                    lineage.push(parent);
                    current = parent.parent.as_ref();
                }
                None => break,
            }
        }
        lineage.reverse();
        lineage
    }

    pub fn depth(&self, id: &Glottocode) -> usize {
        self.ancestors(id).len()
    }

    /// Pre-order walk over the whole tree in serialization order.
    pub fn depth_first(&self) -> Vec<&Languoid> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = self.sorted_children(None);
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children = self.sorted_children(Some(&node.id));
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// All descendants of `id`, pre-order, excluding `id`.
    pub fn descendants(&self, id: &Glottocode) -> Vec<&Languoid> {
        let mut out = Vec::new();
        let mut stack = self.sorted_children(Some(id));
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children = self.sorted_children(Some(&node.id));
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn lookup_by_code(&self, code: &ExternalCode) -> Option<&Languoid> {
        self.codes.get(code).and_then(|id| self.nodes.get(id))
    }

    /// Resolve a user supplied key: a glottocode first, an external code second.
    pub fn languoid(&self, key: &str) -> Option<&Languoid> {
        if let Ok(id) = Glottocode::try_from(key) {
            if let Some(node) = self.nodes.get(&id) {
                return Some(node);
            }
        }
        ExternalCode::try_from(key)
            .ok()
            .and_then(|code| self.lookup_by_code(&code))
    }

    /// Verify that every languoid sits below a parent its level allows: families and languages
    /// at the root or below families, dialects below languages or dialects.
    pub fn check_structure(&self) -> Result<(), LanguoidError> {
        for node in self.nodes.values() {
            let parent = node.parent.as_ref().and_then(|p| self.nodes.get(p));
            if !node.level.may_have_parent(parent.map(|p| p.level)) {
                let position = match parent {
                    Some(parent) => format!("below {} {parent}", parent.level),
                    None => "at the root".to_string(),
                };
                return Err(LanguoidError::InconsistentName(format!(
                    "{} {node} would be left {position}",
                    node.level
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gc(s: &str) -> Glottocode {
        Glottocode::try_from(s).unwrap()
    }

    fn code(s: &str) -> ExternalCode {
        ExternalCode::try_from(s).unwrap()
    }

    fn sample_tree() -> LanguoidTree {
        let mut tree = LanguoidTree::empty();
        tree.insert(Languoid::new(gc("abkh1242"), "Abkhaz-Adyge", Level::Family, None).with_code(code("aaa")))
            .unwrap();
        tree.insert(Languoid::new(
            gc("abkh1243"),
            "Abkhaz-Abaza",
            Level::Family,
            Some(gc("abkh1242")),
        ))
        .unwrap();
        tree.insert(
            Languoid::new(gc("abaz1241"), "Abaza", Level::Language, Some(gc("abkh1243")))
                .with_code(code("abq")),
        )
        .unwrap();
        tree.insert(Languoid::new(
            gc("ashk1247"),
            "Ashkaraua",
            Level::Dialect,
            Some(gc("abaz1241")),
        ))
        .unwrap();
        tree
    }

    #[test]
    fn test_ancestors_and_children() {
        let tree = sample_tree();
        let lineage = tree
            .ancestors(&gc("ashk1247"))
            .iter()
            .map(|l| l.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(lineage, vec!["abkh1242", "abkh1243", "abaz1241"]);
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.children(Some(&gc("abkh1243")))[0].name, "Abaza");
        assert_eq!(tree.depth(&gc("ashk1247")), 3);
        assert!(tree.check_structure().is_ok());
    }

    #[test]
    fn test_code_migration_revokes_previous_holder() {
        let mut tree = sample_tree();
        let revoked = tree.set_code(&gc("ashk1247"), Some(code("aaa"))).unwrap();
        assert_eq!(revoked, Some(gc("abkh1242")));
        assert_eq!(tree.get(&gc("abkh1242")).unwrap().code, None);
        assert_eq!(tree.lookup_by_code(&code("aaa")).unwrap().id, gc("ashk1247"));

        assert_eq!(tree.set_code(&gc("ashk1247"), None).unwrap(), None);
        assert!(tree.lookup_by_code(&code("aaa")).is_none());
        assert!(tree.languoid("aaa").is_none());
        assert_eq!(tree.languoid("abq").unwrap().id, gc("abaz1241"));
    }

    #[test]
    fn test_reparent_and_remove() {
        let mut tree = sample_tree();
        assert!(tree.remove(&gc("abaz1241")).is_err());
        tree.set_parent(&gc("ashk1247"), Some(gc("abkh1243"))).unwrap();
        assert!(!tree.has_children(&gc("abaz1241")));
        assert_eq!(tree.remove(&gc("abaz1241")).unwrap().name, "Abaza");
        assert!(tree.languoid("abq").is_none());
        // a dialect directly below a family breaks the level rules
        assert!(matches!(
            tree.check_structure(),
            Err(LanguoidError::InconsistentName(_))
        ));
    }

    #[test]
    fn test_depth_first_order() {
        let mut tree = sample_tree();
        tree.insert(Languoid::new(gc("abkh1244"), "Abkhazian", Level::Language, Some(gc("abkh1243"))))
            .unwrap();
        let order = tree
            .depth_first()
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["Abkhaz-Adyge", "Abkhaz-Abaza", "Abaza", "Ashkaraua", "Abkhazian"]
        );
        assert_eq!(tree.descendants(&gc("abkh1243")).len(), 3);
    }
}
