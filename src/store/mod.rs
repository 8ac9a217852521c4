//! Storage backends for the languoid tree.
//!
//! A [`NodeStore`] keeps one record ([`NodeAttrs`]) per languoid plus its position below a parent.
//! [`DirectoryStore`] persists the tree as nested directories; [`MemoryStore`] keeps it in maps and
//! backs the unit tests.

use std::collections::BTreeSet;

use crate::{
    error::LanguoidError,
    properties::{ExternalCode, Glottocode, NodeAttrs},
};

pub mod directory;
pub mod memory;
pub mod rmtree;

pub use directory::{DirectoryStore, ATTRS_FILE};
pub use memory::MemoryStore;
pub use rmtree::remove_tree;

pub trait NodeStore {
    /// Add a new languoid below `parent` (the root for `None`).
    fn create(
        &mut self,
        parent: Option<&Glottocode>,
        id: &Glottocode,
        attrs: &NodeAttrs,
    ) -> Result<(), LanguoidError>;

    fn read(&self, id: &Glottocode) -> Result<Option<NodeAttrs>, LanguoidError>;

    fn update(&mut self, id: &Glottocode, attrs: &NodeAttrs) -> Result<(), LanguoidError>;

    /// Re-link `id`, together with its whole subtree, below `parent`.
    fn move_node(
        &mut self,
        id: &Glottocode,
        parent: Option<&Glottocode>,
    ) -> Result<(), LanguoidError>;

    /// Remove `id` and anything still stored below it.
    fn delete(&mut self, id: &Glottocode) -> Result<(), LanguoidError>;

    fn list_children(&self, parent: Option<&Glottocode>) -> Result<Vec<Glottocode>, LanguoidError>;

    fn lookup_by_code(&self, code: &ExternalCode) -> Result<Option<Glottocode>, LanguoidError>;

    fn all_identifiers(&self) -> Result<BTreeSet<Glottocode>, LanguoidError>;
}
