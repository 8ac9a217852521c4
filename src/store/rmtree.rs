use std::{fs, path::Path};

use walkdir::WalkDir;

use crate::error::LanguoidError;

/// Remove the directory `path` with everything below it.
///
/// [`fs::remove_dir_all`] is tried first. Deeply nested trees can make it fail (path length
/// limits on some platforms), in which case the tree is walked contents first and torn down
/// entry by entry from the canonical path.
pub fn remove_tree<P: AsRef<Path>>(path: P) -> Result<(), LanguoidError> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LanguoidError::NotFound(format!("directory {path:?}")))
        }
        Err(e) => {
            tracing::debug!("remove_dir_all failed for {path:?} ({e}), removing entry by entry");
        }
    }
    let root = path.canonicalize()?;
    for entry in WalkDir::new(&root).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
