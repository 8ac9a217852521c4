//! Text codecs for the two flat representations of the languoid tree.
//!
//! ## Key Components
//!
//! - [`chain`] - element and chain syntax (`Name [identifier]code`), indentation handling and the
//!   outline structure both texts share
//! - [`lff`] - the classification text: family paths with languages and shallow dialects
//! - [`dff`] - the dialects text: languages with arbitrarily deep dialect subtrees
//! - [`writer`] - the inverse direction, tree to both texts
//!
//! Reading is purely syntactic. Identity resolution and cross-text validation happen in
//! [`crate::registry`] and [`crate::builder`].

pub mod chain;
pub mod dff;
pub mod lff;
pub mod writer;

pub use chain::{Chain, ChainElement, NodeRef, Outline, OutlineNode, SourceLocation, INDENT};
pub use dff::{read_dialects, DialectEntry, DIALECTS_SOURCE};
pub use lff::{
    read_classification, ClassificationBlock, ClassificationLanguage, CLASSIFICATION_SOURCE,
};
pub use writer::{write_classification, write_dialects};
