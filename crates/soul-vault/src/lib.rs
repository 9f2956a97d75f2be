//! Markdown vault storage for soul-agent.
//!
//! The vault is a directory tree of human-editable Markdown files with YAML
//! frontmatter. This crate provides:
//!
//! - [`VaultStore`] — atomic read/write/list/delete under a rooted directory
//! - [`frontmatter`] — the `---`-delimited header codec and its typed
//!   helpers (classification, lifecycle, activity log)
//!
//! All other components persist through these two layers; nothing else in
//! the workspace touches vault files directly.

pub mod error;
pub mod frontmatter;
pub mod store;

pub use error::{Result, VaultError};
pub use frontmatter::{ActivityEntry, Fields, Priority};
pub use store::{SearchHit, VaultDir, VaultStore};
