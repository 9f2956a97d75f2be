//! Vault store — atomic Markdown file I/O under a rooted directory.
//!
//! A single process-wide instance owns the vault root. Every mutation writes
//! to a temp file and renames it into place, so a crash never leaves a
//! partial file. A process-wide lock serializes concurrent writers to the
//! same path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Result, VaultError};
use crate::frontmatter;

/// Recognized vault subdirectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultDir {
    Logs,
    TodosActive,
    TodosDone,
    Insights,
    Core,
    Classified,
}

impl VaultDir {
    /// All subdirectories, created at vault construction.
    pub const ALL: [VaultDir; 6] = [
        VaultDir::Logs,
        VaultDir::TodosActive,
        VaultDir::TodosDone,
        VaultDir::Insights,
        VaultDir::Core,
        VaultDir::Classified,
    ];

    /// Relative path under the vault root.
    pub fn as_str(self) -> &'static str {
        match self {
            VaultDir::Logs => "logs",
            VaultDir::TodosActive => "todos/active",
            VaultDir::TodosDone => "todos/done",
            VaultDir::Insights => "insights",
            VaultDir::Core => "core",
            VaultDir::Classified => "classified",
        }
    }
}

impl std::fmt::Display for VaultDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search hit with surrounding context.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Path relative to the vault root, e.g. `logs/2026-03-01.md`.
    pub path: String,
    /// Bare filename.
    pub filename: String,
    /// Snippet around the first matched token.
    pub snippet: String,
}

/// The vault store. Cheap to clone via `Arc`.
pub struct VaultStore {
    root: PathBuf,
    // Serializes writes; file renames are atomic but read-modify-write
    // sequences on the same file are not.
    lock: Mutex<()>,
}

impl VaultStore {
    /// Open (or initialize) a vault at `root`, creating the root and all
    /// recognized subdirectories. Failure here is fatal to the daemon.
    pub fn open(root: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let root = root.into();
        for dir in VaultDir::ALL {
            let path = root.join(dir.as_str());
            std::fs::create_dir_all(&path).map_err(|source| VaultError::RootUnavailable {
                path: path.clone(),
                source,
            })?;
        }
        debug!(root = %root.display(), "Vault opened");
        Ok(Arc::new(Self {
            root,
            lock: Mutex::new(()),
        }))
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file. Returns `None` when missing or unreadable; a read never
    /// fails loudly.
    pub fn read(&self, dir: VaultDir, name: &str) -> Option<String> {
        validate_name(name).ok()?;
        let _guard = self.lock.lock();
        std::fs::read_to_string(self.root.join(dir.as_str()).join(name)).ok()
    }

    /// Write a file atomically, overwriting any existing content.
    pub fn write(&self, dir: VaultDir, name: &str, content: &str) -> Result<()> {
        validate_name(name)?;
        let dir_path = self.root.join(dir.as_str());
        let path = dir_path.join(name);

        let _guard = self.lock.lock();
        std::fs::create_dir_all(&dir_path).map_err(|source| VaultError::Io {
            path: dir_path.clone(),
            source,
        })?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir_path).map_err(|source| VaultError::Io {
                path: path.clone(),
                source,
            })?;
        tmp.write_all(content.as_bytes())
            .map_err(|source| VaultError::Io {
                path: path.clone(),
                source,
            })?;
        tmp.persist(&path).map_err(|e| VaultError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    /// Delete a file. Returns whether a file was removed.
    pub fn delete(&self, dir: VaultDir, name: &str) -> bool {
        if validate_name(name).is_err() {
            return false;
        }
        let _guard = self.lock.lock();
        std::fs::remove_file(self.root.join(dir.as_str()).join(name)).is_ok()
    }

    /// List `*.md` filenames under a directory, lexicographically sorted.
    pub fn list(&self, dir: VaultDir) -> Vec<String> {
        let _guard = self.lock.lock();
        let Ok(entries) = std::fs::read_dir(self.root.join(dir.as_str())) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.ends_with(".md") && !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    /// Write a short content-addressed note under `classified/`.
    ///
    /// The filename derives from the text hash, so re-ingesting identical
    /// text overwrites the same file. Returns the filename written.
    pub fn ingest_text(&self, text: &str, source: &str) -> Result<String> {
        let hash = hex::encode(Sha256::digest(text.as_bytes()));
        let name = format!("note-{}.md", &hash[..16]);

        let mut fields = frontmatter::Fields::new();
        fields.insert("type".to_string(), "note".to_string());
        fields.insert(
            "date".to_string(),
            chrono::Local::now().date_naive().to_string(),
        );
        fields.insert("source".to_string(), source.to_string());

        self.write(
            VaultDir::Classified,
            &name,
            &frontmatter::build(&fields, text),
        )?;
        Ok(name)
    }

    /// Tokenized keyword search across vault directories.
    ///
    /// Every whitespace-separated token must appear (case-insensitive) in a
    /// file for it to match. Returns at most `limit` hits.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for dir in VaultDir::ALL {
            for name in self.list(dir) {
                let Some(text) = self.read(dir, &name) else {
                    continue;
                };
                let lower = text.to_lowercase();
                if tokens.iter().all(|t| lower.contains(t.as_str())) {
                    hits.push(SearchHit {
                        path: format!("{}/{}", dir.as_str(), name),
                        filename: name,
                        snippet: extract_snippet(&text, &tokens[0]),
                    });
                    if hits.len() >= limit {
                        return hits;
                    }
                }
            }
        }
        hits
    }
}

/// Reject names that escape their directory.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        warn!(name, "Rejected vault resource name");
        return Err(VaultError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Extract a snippet of ±100 bytes around the first occurrence of `token`,
/// clamped to char boundaries.
fn extract_snippet(text: &str, token: &str) -> String {
    const CONTEXT: usize = 100;
    let lower = text.to_lowercase();
    // Byte offsets into `lower` only line up with `text` when lowercasing
    // preserved byte lengths (true for ASCII and CJK).
    let idx = if lower.len() == text.len() {
        lower.find(token)
    } else {
        None
    };
    let Some(idx) = idx else {
        return text.chars().take(200).collect();
    };

    let mut start = idx.saturating_sub(CONTEXT);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (idx + token.len() + CONTEXT).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = text[start..end].replace('\n', " ").trim().to_string();
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}
