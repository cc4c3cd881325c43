//! Binary entry point that glues the SQLite-backed store to the TUI.
//! Summarizing the bootstrapping pipeline here keeps the intent obvious when
//! revisiting the code: we set up logging, spawn the store worker pool, hand
//! its channels to the app state, and drive the Ratatui event loop until the
//! user exits.
use recipe_book::db;
use recipe_book::logging::{init_logging, LOG_FILE_NAME};
use recipe_book::{run_app, App, StorePool, STORE_WORKERS};
use tracing::info;

/// Initialize persistence, spawn the workers, and launch the Ratatui event
/// loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// an unwritable home directory) to the terminal instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let log_path = db::data_dir()?.join(LOG_FILE_NAME);
    init_logging(&log_path)?;

    let store = db::store_path()?;
    info!("opening recipe store at {}", store.display());
    let (pool, handle, events) = StorePool::spawn(&store, STORE_WORKERS)?;

    let mut app = App::new(handle, events)?;
    let result = run_app(&mut app);

    // The app holds the last job-queue handle; dropping it lets the workers
    // drain and exit before we wait on them.
    drop(app);
    pool.join();
    result
}
