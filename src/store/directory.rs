//! The on-disk tree: one directory per languoid.
//!
//! ```text
//! tree/
//!   abkh1242/
//!     md.toml
//!     abkh1243/
//!       md.toml
//!       abaz1241/
//!         md.toml
//! ```
//!
//! A directory is named by the identifier of its languoid and nested in the directory of the
//! parent; `md.toml` holds name, level and the optional external code. Directories whose name is
//! not an identifier, or that lack `md.toml`, are not languoids and are left alone.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

use crate::{
    config::{get_content, set_content},
    error::LanguoidError,
    properties::{ExternalCode, Glottocode, NodeAttrs},
    store::{remove_tree, NodeStore},
};

pub const ATTRS_FILE: &str = "md.toml";

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    paths: BTreeMap<Glottocode, PathBuf>,
    parents: BTreeMap<Glottocode, Option<Glottocode>>,
    children: BTreeMap<Option<Glottocode>, BTreeSet<Glottocode>>,
    codes: BTreeMap<ExternalCode, Glottocode>,
}

impl DirectoryStore {
    /// Open (or start) the tree below `root` and index every languoid directory in it.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, LanguoidError> {
        fn is_hidden(entry: &DirEntry) -> bool {
            entry
                .file_name()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        }
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let mut store = DirectoryStore {
            root: root.clone(),
            paths: BTreeMap::new(),
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
            codes: BTreeMap::new(),
        };
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || (e.file_type().is_dir() && !is_hidden(e)))
        {
            let path = entry?.into_path();
            let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| Glottocode::try_from(name).ok())
            else {
                continue;
            };
            if !path.join(ATTRS_FILE).is_file() {
                tracing::debug!("Skipping {path:?}, no {ATTRS_FILE}");
                continue;
            }
            if let Some(other) = store.paths.get(&id) {
                return Err(LanguoidError::Custom(format!(
                    "languoid {id} is stored twice, at {other:?} and {path:?}"
                )));
            }
            let attrs = read_attrs(&path)?;
            if let Some(code) = attrs.code {
                store.codes.insert(code, id.clone());
            }
            // walk order puts every directory after the one enclosing it
            match store.enclosing(&path) {
                Some(parent) => store.link(&id, parent),
                None => tracing::warn!("{path:?} is not below a languoid, not linked into the tree"),
            }
            store.paths.insert(id, path);
        }
        tracing::debug!("Indexed {} languoids below {root:?}", store.paths.len());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, id: &Glottocode) -> Option<&Path> {
        self.paths.get(id).map(|p| p.as_path())
    }

    /// The parent of a stored languoid, `None` for roots and unknown identifiers.
    pub fn parent(&self, id: &Glottocode) -> Option<&Glottocode> {
        self.parents.get(id).and_then(|p| p.as_ref())
    }

    /// The languoid whose directory directly contains `path`: `Some(None)` for the root.
    fn enclosing(&self, path: &Path) -> Option<Option<Glottocode>> {
        let dir = path.parent()?;
        if dir == self.root {
            return Some(None);
        }
        let id = Glottocode::try_from(dir.file_name()?.to_str()?).ok()?;
        (self.paths.get(&id).map(|p| p.as_path()) == Some(dir)).then_some(Some(id))
    }

    fn link(&mut self, id: &Glottocode, parent: Option<Glottocode>) {
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(id.clone());
        self.parents.insert(id.clone(), parent);
    }

    fn unlink(&mut self, id: &Glottocode) {
        if let Some(parent) = self.parents.remove(id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(id);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
    }

    fn node_path(&self, id: &Glottocode) -> Result<&PathBuf, LanguoidError> {
        self.paths
            .get(id)
            .ok_or_else(|| LanguoidError::NotFound(format!("stored languoid {id}")))
    }

    fn parent_dir(&self, parent: Option<&Glottocode>) -> Result<PathBuf, LanguoidError> {
        match parent {
            Some(parent) => Ok(self.node_path(parent)?.clone()),
            None => Ok(self.root.clone()),
        }
    }

    fn bind_code(&mut self, id: &Glottocode, old: Option<&ExternalCode>, new: Option<&ExternalCode>) {
        if let Some(old) = old {
            if self.codes.get(old) == Some(id) {
                self.codes.remove(old);
            }
        }
        if let Some(new) = new {
            self.codes.insert(new.clone(), id.clone());
        }
    }
}

fn read_attrs(dir: &Path) -> Result<NodeAttrs, LanguoidError> {
    let content = get_content(dir.join(ATTRS_FILE))?;
    Ok(toml::from_str(&content)?)
}

fn write_attrs(dir: &Path, attrs: &NodeAttrs) -> Result<(), LanguoidError> {
    set_content(dir.join(ATTRS_FILE), toml::to_string(attrs)?)
}

impl NodeStore for DirectoryStore {
    fn create(
        &mut self,
        parent: Option<&Glottocode>,
        id: &Glottocode,
        attrs: &NodeAttrs,
    ) -> Result<(), LanguoidError> {
        if let Some(existing) = self.paths.get(id) {
            return Err(LanguoidError::Custom(format!(
                "languoid {id} already exists at {existing:?}"
            )));
        }
        let dir = self.parent_dir(parent)?.join(id.as_str());
        fs::create_dir(&dir)?;
        write_attrs(&dir, attrs)?;
        self.bind_code(id, None, attrs.code.as_ref());
        self.paths.insert(id.clone(), dir);
        self.link(id, parent.cloned());
        Ok(())
    }

    fn read(&self, id: &Glottocode) -> Result<Option<NodeAttrs>, LanguoidError> {
        match self.paths.get(id) {
            Some(dir) => Ok(Some(read_attrs(dir)?)),
            None => Ok(None),
        }
    }

    fn update(&mut self, id: &Glottocode, attrs: &NodeAttrs) -> Result<(), LanguoidError> {
        let dir = self.node_path(id)?.clone();
        let previous = read_attrs(&dir)?;
        write_attrs(&dir, attrs)?;
        self.bind_code(id, previous.code.as_ref(), attrs.code.as_ref());
        Ok(())
    }

    fn move_node(
        &mut self,
        id: &Glottocode,
        parent: Option<&Glottocode>,
    ) -> Result<(), LanguoidError> {
        let from = self.node_path(id)?.clone();
        let parent_dir = self.parent_dir(parent)?;
        if parent_dir.starts_with(&from) {
            return Err(LanguoidError::Custom(format!(
                "cannot move {id} into its own subtree at {parent_dir:?}"
            )));
        }
        let to = parent_dir.join(id.as_str());
        if to == from {
            return Ok(());
        }
        fs::rename(&from, &to)?;
        let mut moved = Vec::new();
        for (node, path) in self.paths.iter() {
            if path.starts_with(&from) {
                moved.push((node.clone(), to.join(path.strip_prefix(&from)?)));
            }
        }
        tracing::debug!("Moved {} directories from {from:?} to {to:?}", moved.len());
        self.paths.extend(moved);
        self.unlink(id);
        self.link(id, parent.cloned());
        Ok(())
    }

    fn delete(&mut self, id: &Glottocode) -> Result<(), LanguoidError> {
        let dir = self.node_path(id)?.clone();
        remove_tree(&dir)?;
        self.unlink(id);
        let removed = self
            .paths
            .iter()
            .filter(|(_, path)| path.starts_with(&dir))
            .map(|(node, _)| node.clone())
            .collect::<Vec<_>>();
        for node in removed.iter() {
            self.paths.remove(node);
            self.parents.remove(node);
            self.children.remove(&Some(node.clone()));
        }
        let paths = &self.paths;
        self.codes.retain(|_, holder| paths.contains_key(holder));
        Ok(())
    }

    fn list_children(&self, parent: Option<&Glottocode>) -> Result<Vec<Glottocode>, LanguoidError> {
        if let Some(parent) = parent {
            self.node_path(parent)?;
        }
        Ok(self
            .children
            .get(&parent.cloned())
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn lookup_by_code(&self, code: &ExternalCode) -> Result<Option<Glottocode>, LanguoidError> {
        Ok(self.codes.get(code).cloned())
    }

    fn all_identifiers(&self) -> Result<BTreeSet<Glottocode>, LanguoidError> {
        Ok(self.paths.keys().cloned().collect())
    }
}
