//! Signal producers for soul-agent.
//!
//! Every producer runs on its own task (or OS thread, for the `notify`
//! watcher), observes a cancellation token, and communicates with the rest
//! of the system only by pushing [`soul_ingest::IngestItem`]s into the
//! shared queue. Capture is best-effort by design: a producer that cannot
//! start logs once and stays disabled.

pub mod browser;
pub mod clipboard;
pub mod error;
pub mod filewatcher;
pub mod input_hook;

pub use browser::{read_chrome_history, read_safari_history, BrowserPoller, Visit};
pub use clipboard::{Clipboard, ClipboardPoller, SystemClipboard};
pub use error::{ProducerError, Result};
pub use filewatcher::{FileWatcher, WatcherHandle};
pub use input_hook::{spawn_input_hook, InputBuffer, InputHook, KeyEvent, KeyEventSource};
