//! devshelf - offline fuzzy search and reader for API documentation.
//!
//! Installed docs are plain JSON indexes plus one HTML file per entry.
//! Entry names are ranked with a subsequence fuzzy matcher across any
//! subset of installed docs, and the best hit is rendered to plain text or
//! markdown after stripping page chrome.
//!
//! # Quick start
//!
//! ```no_run
//! use devshelf::{ContentSource, DataDir, Engine, Format, Renderer, Store};
//! use devshelf::search::SourceIndex;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = Store::open(&data_dir);
//!
//! let sources = store
//!     .list_installed()
//!     .unwrap()
//!     .into_iter()
//!     .map(|slug| {
//!         let index = store.load_index(&slug).unwrap();
//!         SourceIndex::new(slug, index)
//!     });
//! let engine = Engine::new(sources, 10).unwrap();
//!
//! let outcome = engine.search("useState", &[]).unwrap();
//! for r in &outcome.results {
//!     println!("{} [{}] {} ({:.2})", r.entry.name, r.entry.kind, r.source_id, r.score);
//! }
//!
//! if let Some(best) = outcome.results.first() {
//!     let html = store.load_content(&best.source_id, &best.entry.path).unwrap();
//!     println!("{}", Renderer::new(Format::Markdown).render(&html));
//! }
//! ```

pub mod cli;
pub mod data_dir;
pub mod docset;
pub mod error;
pub mod markdown;
pub mod output;
pub mod readability;
pub mod render;
pub mod search;
pub mod store;
pub mod text_util;

pub use data_dir::DataDir;
pub use docset::{Entry, Index};
pub use error::{Error, Result};
pub use render::{Format, Renderer};
pub use search::Engine;
pub use store::{ContentSource, Store};
