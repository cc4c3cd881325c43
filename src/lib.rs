//! Core library surface for the Recipe Book TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as potential external tooling can reuse the same pieces.
//! Keeping the glue logic documented makes it easy to recall why each re-export
//! exists when revisiting the project.
pub mod db;
pub mod imaging;
pub mod logging;
pub mod models;
pub mod picker;
pub mod ui;

/// Convenience re-exports for the persistence layer. These are typically used
/// by `main.rs` to locate the embedded SQLite store and bring up the worker
/// pool that owns it.
pub use db::{store_path, StoreHandle, StorePool, STORE_WORKERS};

/// The primary domain types that other layers manipulate.
pub use models::{Recipe, RecipeDraft, NO_RECIPE_ID};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
