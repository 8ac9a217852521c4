//! Reader for the dialects text (`dff.txt`).
//!
//! ```text
//! Abaza [abaz1241]abq
//!     Ashkaraua [ashk1247]
//!         Lower Ashkaraua []
//!     Tapanta [tapa1256]
//! ```
//!
//! The first element of a top-level chain names a language already listed in the classification
//! text; further chain elements and every indented line are dialects, one level deeper per
//! indentation unit.

use crate::{
    codec::chain::{parse_outlines, Outline},
    error::LanguoidError,
};

pub const DIALECTS_SOURCE: &str = "dff.txt";

pub type DialectEntry = Outline;

pub fn read_dialects(text: &str, source: &str) -> Result<Vec<DialectEntry>, LanguoidError> {
    let entries = parse_outlines(text, source)?;
    tracing::debug!("Read {} dialect entries from {source}", entries.len());
    Ok(entries)
}
