//! One-shot source scan. Runs once at startup, before the agent exists; the
//! resulting inventory is immutable for the agent's lifetime.

use crate::agent::error::Error;
use crate::weak_error;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extension of sources the runtime executes natively. Transpiled languages
/// extend the allow-list through their registered frontends.
pub const NATIVE_EXTENSION: &str = "js";

/// One candidate source file known to the runtime.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Canonical absolute path.
    pub path: PathBuf,
    pub len: u64,
    /// Hex-rendered content digest, for change detection.
    pub hash: String,
    /// Newline-terminated line count, for snapshot position validation.
    pub lines: u32,
    /// Path components, the suffix-lookup key of the resolver.
    pub(crate) segments: Vec<String>,
}

impl FileEntry {
    /// True when the entry's last `k` path components equal `suffix`'s last
    /// `k`. Matches align on full segment boundaries only.
    pub(crate) fn matches_suffix(&self, suffix: &[String], k: usize) -> bool {
        if self.segments.len() < k || suffix.len() < k {
            return false;
        }
        let own = &self.segments[self.segments.len() - k..];
        let wanted = &suffix[suffix.len() - k..];
        own == wanted
    }

    pub fn basename(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

/// Read-only list of candidate source files discovered at startup.
#[derive(Debug)]
pub struct Inventory {
    entries: Vec<FileEntry>,
    aggregate_hash: String,
    extensions: Vec<String>,
}

impl Inventory {
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Deterministic digest of the scanned set and per-file hashes. The
    /// registration loop sends it as the project-identity probe.
    pub fn aggregate_hash(&self) -> &str {
        &self.aggregate_hash
    }

    /// The extension allow-list the scan ran with.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn by_path(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub(crate) fn from_parts(entries: Vec<FileEntry>, extensions: Vec<String>) -> Self {
        let aggregate_hash = aggregate(&entries);
        Inventory {
            entries,
            aggregate_hash,
            extensions,
        }
    }
}

/// Recursively enumerate source files under `root` whose extension is the
/// native one or one of `transpiled_extensions`. Symlinks are followed;
/// walkdir's ancestor check breaks link loops.
pub fn scan(root: &Path, transpiled_extensions: &[String]) -> Result<Inventory, Error> {
    let mut extensions: Vec<String> = vec![NATIVE_EXTENSION.to_string()];
    extensions.extend(transpiled_extensions.iter().cloned());

    let mut entries = vec![];
    for dir_entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| weak_error!(e, "skip unreadable directory entry:"))
    {
        if !dir_entry.file_type().is_file() {
            continue;
        }
        let ext = dir_entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !extensions.iter().any(|allowed| allowed == ext) {
            continue;
        }
        if let Some(entry) = weak_error!(read_entry(dir_entry.path()), "skip source file:") {
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    log::info!(target: "agent", "scanned {} source files under {}", entries.len(), root.display());

    Ok(Inventory::from_parts(entries, extensions))
}

fn read_entry(path: &Path) -> Result<FileEntry, Error> {
    let path = path.canonicalize()?;
    let bytes = std::fs::read(&path)?;

    let mut lines = bytes.iter().filter(|&&b| b == b'\n').count() as u32;
    if bytes.last().is_some_and(|&b| b != b'\n') {
        lines += 1;
    }

    let segments = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(FileEntry {
        len: bytes.len() as u64,
        hash: hex(&Sha256::digest(&bytes)),
        lines,
        segments,
        path,
    })
}

fn aggregate(entries: &[FileEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(entry.hash.as_bytes());
        hasher.update([b'\n']);
    }
    hex(&hasher.finalize())
}

fn hex(digest: &[u8]) -> String {
    digest.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
pub(crate) fn synthetic(paths: &[&str]) -> Inventory {
    let entries = paths
        .iter()
        .map(|p| FileEntry {
            path: PathBuf::from(p),
            len: 0,
            hash: String::new(),
            lines: 100,
            segments: p
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
        .collect();
    Inventory::from_parts(entries, vec![NATIVE_EXTENSION.to_string(), "es6".to_string()])
}
