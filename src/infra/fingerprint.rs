//! Source fingerprints
//!
//! SHA-256 over everything that determines a package's build output: the
//! definition file, the spec file, every local source file (relative path
//! and contents, in sorted order), and each remote source's URL and declared
//! checksum.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::core::package::{SourceLocation, SourceSpec};
use crate::error::FilesystemError;

/// Compute the fingerprint of a package's current sources
pub fn fingerprint(definition: &[u8], source: &SourceLocation) -> Result<String, FilesystemError> {
    let mut hasher = Sha256::new();

    hash_field(&mut hasher, b"definition", definition);
    hash_field(&mut hasher, b"spec", &read(&source.spec_file)?);

    for spec in &source.sources {
        match spec {
            SourceSpec::Local { path } => hash_tree(&mut hasher, &source.resolve(path))?,
            SourceSpec::Url { url, sha256 } => {
                hash_field(&mut hasher, b"url", url.as_bytes());
                hash_field(&mut hasher, b"sha256", sha256.to_lowercase().as_bytes());
            }
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Length-prefixed field so adjacent fields cannot run together
fn hash_field(hasher: &mut Sha256, tag: &[u8], data: &[u8]) {
    hasher.update(tag);
    hasher.update((data.len() as u64).to_le_bytes());
    hasher.update(data);
}

fn hash_tree(hasher: &mut Sha256, root: &Path) -> Result<(), FilesystemError> {
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| FilesystemError::ReadFile {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hash_field(hasher, b"path", relative.to_string_lossy().as_bytes());
        hash_field(hasher, b"file", &read(entry.path())?);
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>, FilesystemError> {
    std::fs::read(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
