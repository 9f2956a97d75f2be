//! Ingest data model and batching queue for soul-agent.
//!
//! Producers (clipboard, browser, filesystem, keystrokes, terminal, HTTP)
//! create [`IngestItem`]s and push them into the shared [`IngestQueue`];
//! the pipeline consumer drains batches and turns them into
//! [`ClassifiedItem`]s. This crate has no I/O beyond the in-memory queue.

pub mod item;
pub mod queue;

pub use item::{ActionType, Category, ClassifiedItem, IngestItem, ItemMeta, Source};
pub use queue::{IngestQueue, QueueConfig};
