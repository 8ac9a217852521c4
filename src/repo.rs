//! A languoid repository on disk: configuration, the two texts and the directory tree.

use std::path::{Path, PathBuf};

use crate::{
    builder::merge,
    codec::{write_classification, write_dialects},
    config::{get_content, set_content, RepoConfig},
    error::LanguoidError,
    materialize::{apply, OpSummary},
    properties::{ExternalCode, Glottocode, Languoid},
    store::{DirectoryStore, NodeStore},
    tree::LanguoidTree,
};

#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    config: RepoConfig,
    store: DirectoryStore,
}

impl Repository {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, LanguoidError> {
        let root = root.as_ref().to_path_buf();
        let config = RepoConfig::load(&root)?;
        let store = DirectoryStore::open(root.join(&config.tree))?;
        tracing::debug!("Opened languoid repository at {root:?}");
        Ok(Repository {
            root,
            config,
            store,
        })
    }

    pub fn classification_path(&self) -> PathBuf {
        self.root.join(&self.config.classification)
    }

    pub fn dialects_path(&self) -> PathBuf {
        self.root.join(&self.config.dialects)
    }

    pub fn store(&self) -> &DirectoryStore {
        &self.store
    }

    pub fn tree(&self) -> Result<LanguoidTree, LanguoidError> {
        LanguoidTree::load(&self.store)
    }

    /// Look a languoid up by identifier or external code, reading only its own directory.
    pub fn languoid(&self, key: &str) -> Result<Option<Languoid>, LanguoidError> {
        let mut id = Glottocode::try_from(key)
            .ok()
            .filter(|id| self.store.path(id).is_some());
        if id.is_none() {
            if let Ok(code) = ExternalCode::try_from(key) {
                id = self.store.lookup_by_code(&code)?;
            }
        }
        let Some(id) = id else {
            return Ok(None);
        };
        let parent = self.store.parent(&id).cloned();
        Ok(self
            .store
            .read(&id)?
            .map(|attrs| Languoid::from_attrs(id, parent, attrs)))
    }

    /// The ancestors of a stored languoid, nearest first.
    pub fn ancestors(&self, id: &Glottocode) -> Result<Vec<Languoid>, LanguoidError> {
        let mut ancestors = Vec::new();
        let mut current = self.store.parent(id).cloned();
        while let Some(id) = current {
            let Some(languoid) = self.languoid(id.as_str())? else {
                break;
            };
            current = languoid.parent.clone();
            ancestors.push(languoid);
        }
        Ok(ancestors)
    }

    /// Merge the classification and dialects texts into the stored tree.
    ///
    /// A missing dialects file counts as empty. Nothing is written unless the whole pass
    /// validates.
    pub fn lff2tree(&mut self) -> Result<OpSummary, LanguoidError> {
        let classification = get_content(self.classification_path())?;
        let dialects_path = self.dialects_path();
        let dialects = if dialects_path.exists() {
            get_content(dialects_path)?
        } else {
            tracing::info!("No dialects text at {dialects_path:?}, treating it as empty");
            String::new()
        };
        let stored = self.tree()?;
        let outcome = merge(&stored, &classification, &dialects)?;
        let summary = apply(&mut self.store, &outcome.ops)?;
        tracing::info!("lff2tree: {summary}");
        Ok(summary)
    }

    /// Regenerate both texts from the stored tree.
    pub fn tree2lff(&self) -> Result<(), LanguoidError> {
        let tree = self.tree()?;
        set_content(self.classification_path(), write_classification(&tree)?)?;
        set_content(self.dialects_path(), write_dialects(&tree)?)?;
        tracing::info!("tree2lff: wrote {} languoids", tree.len());
        Ok(())
    }
}
