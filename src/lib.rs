//! # languoid-core
//!
//! Bidirectional synchronization between a tree of languoids (families, languages and dialects)
//! stored as one directory per node, and the two flat, human-edited texts that describe it.
//!
//! ## Overview
//!
//! Curators edit two outline texts:
//!
//! - the **classification text** (`lff.txt`), listing family paths with their languages and,
//!   optionally, a shallow level of dialects;
//! - the **dialects text** (`dff.txt`), listing languages with dialect subtrees of any depth.
//!
//! A merge pass (`lff2tree`) reads both texts, resolves every mention to a stable identifier (a
//! [`properties::Glottocode`]), validates the result as a whole and only then writes the
//! difference into the stored tree. The inverse direction (`tree2lff`) regenerates both texts from
//! the tree, so that editing the texts and merging them back is lossless.
//!
//! ### Key Features
//!
//! - **Stable identifiers**: `[]` mints a fresh identifier from the languoid's name, explicit
//!   identifiers survive renames and moves
//! - **Exclusive external codes**: assigning an ISO 639-3 or `NOCODE_` code moves it away from its
//!   previous holder
//! - **All-or-nothing passes**: any validation error leaves the stored tree untouched
//! - **Pruning**: languoids no longer mentioned disappear, unless they still carry a code or
//!   children
//!
//! ## Architecture
//!
//! - **[`codec`]**: reading and writing the two texts
//! - **[`registry`]**: identity resolution and mention validation for one pass
//! - **[`builder`]**: the three-phase merge pass
//! - **[`tree`]**: the in-memory [`tree::LanguoidTree`]
//! - **[`materialize`]**: diffing trees into ordered storage operations
//! - **[`store`]**: the [`store::NodeStore`] trait with directory and in-memory backends
//! - **[`repo`]**: a repository on disk, tying configuration, texts and tree together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use languoid_core::repo::Repository;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut repo = Repository::open("./glottolog")?;
//!     let summary = repo.lff2tree()?;
//!     println!("{summary}");
//!     if let Some(abaza) = repo.languoid("abq")? {
//!         println!("{abaza}");
//!     }
//!     repo.tree2lff()?;
//!     Ok(())
//! }
//! ```
//!
//! Merging without any storage involved:
//!
//! ```rust
//! use languoid_core::{builder::merge, tree::LanguoidTree};
//!
//! let lff = "Abkhaz-Adyge [abkh1242]\n    Abaza [abaz1241]abq\n";
//! let dff = "Abaza [abaz1241]abq\n    Tapanta []\n";
//! let outcome = merge(&LanguoidTree::empty(), lff, dff).unwrap();
//! assert_eq!(outcome.tree.len(), 3);
//! assert!(outcome.tree.languoid("tapa1234").is_some());
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod error;
pub mod materialize;
pub mod properties;
pub mod registry;
pub mod repo;
pub mod store;
pub mod tree;

pub use error::*;
