//! Background execution of store operations. The UI thread never touches a
//! connection directly: it submits jobs through a [`StoreHandle`], and replies
//! come back over a channel drained by the event loop.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::db::{connection, recipes};
use crate::models::{Recipe, RecipeDraft};

/// Number of worker threads the application runs with. Two is plenty for a
/// single-user tool while still letting a slow fetch overlap an insert.
pub const STORE_WORKERS: usize = 2;

/// Correlates a submitted job with the reply event it produces. Screens hold
/// tickets in a [`Subscriptions`] set to tell their own replies apart from
/// stale ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// One store operation, as carried by the job queue.
#[derive(Debug)]
pub enum StoreRequest {
    /// Load every recipe in insertion order.
    FetchAll,
    /// Load zero or one recipe by id.
    FetchById(i64),
    /// Durably store a draft and echo the hydrated record.
    Insert(RecipeDraft),
    /// Remove a record by id; absent ids report `false`.
    Delete(i64),
}

impl StoreRequest {
    fn kind(&self) -> &'static str {
        match self {
            StoreRequest::FetchAll => "fetch-all",
            StoreRequest::FetchById(_) => "fetch-by-id",
            StoreRequest::Insert(_) => "insert",
            StoreRequest::Delete(_) => "delete",
        }
    }
}

/// Successful payloads, one variant per request kind.
#[derive(Debug)]
pub enum StoreReply {
    /// Full ordered set for [`StoreRequest::FetchAll`].
    Recipes(Vec<Recipe>),
    /// Zero-or-one result for [`StoreRequest::FetchById`].
    Recipe(Option<Recipe>),
    /// The hydrated record for [`StoreRequest::Insert`].
    Inserted(Recipe),
    /// Whether [`StoreRequest::Delete`] actually removed a row.
    Deleted(bool),
}

/// A finished job delivered back to the UI thread.
#[derive(Debug)]
pub struct StoreEvent {
    /// Ticket of the submission that produced this event.
    pub ticket: Ticket,
    /// The payload, or the error the operation failed with.
    pub outcome: Result<StoreReply>,
}

#[derive(Debug)]
struct StoreJob {
    ticket: Ticket,
    request: StoreRequest,
}

/// Cheap cloneable submission side of the pool. Every submission returns the
/// ticket its reply will carry.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    jobs: Sender<StoreJob>,
    next_ticket: Arc<AtomicU64>,
}

impl StoreHandle {
    fn submit(&self, request: StoreRequest) -> Result<Ticket> {
        let ticket = Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        debug!("submitting {} job (ticket {})", request.kind(), ticket.0);
        self.jobs
            .send(StoreJob { ticket, request })
            .map_err(|_| anyhow!("store workers are no longer running"))?;
        Ok(ticket)
    }

    /// Queue a fetch of the full recipe set.
    pub fn fetch_all(&self) -> Result<Ticket> {
        self.submit(StoreRequest::FetchAll)
    }

    /// Queue a lookup of a single recipe by id.
    pub fn fetch_by_id(&self, id: i64) -> Result<Ticket> {
        self.submit(StoreRequest::FetchById(id))
    }

    /// Queue an insert of a finished draft.
    pub fn insert(&self, draft: RecipeDraft) -> Result<Ticket> {
        self.submit(StoreRequest::Insert(draft))
    }

    /// Queue removal of an existing record.
    pub fn delete(&self, recipe: &Recipe) -> Result<Ticket> {
        self.submit(StoreRequest::Delete(recipe.id))
    }
}

/// The running pool. Holds the join handles so shutdown can wait for workers
/// to finish flushing their current job.
#[derive(Debug)]
pub struct StorePool {
    workers: Vec<JoinHandle<()>>,
}

impl StorePool {
    /// Spawn `worker_count` threads, each with its own connection to the store
    /// at `path`. Returns the pool, the submission handle, and the receiving
    /// end of the reply channel. Dropping every handle clone closes the job
    /// queue and lets the workers drain and exit.
    pub fn spawn(
        path: &Path,
        worker_count: usize,
    ) -> Result<(StorePool, StoreHandle, Receiver<StoreEvent>)> {
        let (job_tx, job_rx) = mpsc::channel::<StoreJob>();
        let (event_tx, event_rx) = mpsc::channel::<StoreEvent>();
        let queue = Arc::new(Mutex::new(job_rx));

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            // Opened on the caller's thread so a broken store path fails the
            // spawn instead of killing a worker later.
            let conn = connection::open_store(path)
                .with_context(|| format!("failed to open store for worker {index}"))?;
            let queue = Arc::clone(&queue);
            let events = event_tx.clone();
            let worker = thread::Builder::new()
                .name(format!("store-worker-{index}"))
                .spawn(move || run_worker(conn, queue, events))
                .context("failed to spawn store worker")?;
            workers.push(worker);
        }

        let handle = StoreHandle {
            jobs: job_tx,
            next_ticket: Arc::new(AtomicU64::new(0)),
        };
        Ok((StorePool { workers }, handle, event_rx))
    }

    /// Wait for every worker to exit. Call after the last [`StoreHandle`] has
    /// been dropped, otherwise the workers are still blocked on the queue.
    pub fn join(self) {
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn run_worker(conn: Connection, queue: Arc<Mutex<Receiver<StoreJob>>>, events: Sender<StoreEvent>) {
    loop {
        let job = {
            let guard = match queue.lock() {
                Ok(guard) => guard,
                // A sibling worker panicked mid-receive; nothing left to do.
                Err(_) => return,
            };
            match guard.recv() {
                Ok(job) => job,
                Err(_) => return,
            }
        };

        debug!("executing {} job (ticket {})", job.request.kind(), job.ticket.0);
        let outcome = execute(&conn, job.request);
        let event = StoreEvent {
            ticket: job.ticket,
            outcome,
        };
        if events.send(event).is_err() {
            // The UI side hung up; the remaining queue is moot.
            return;
        }
    }
}

fn execute(conn: &Connection, request: StoreRequest) -> Result<StoreReply> {
    match request {
        StoreRequest::FetchAll => recipes::fetch_recipes(conn).map(StoreReply::Recipes),
        StoreRequest::FetchById(id) => recipes::fetch_recipe(conn, id).map(StoreReply::Recipe),
        StoreRequest::Insert(draft) => {
            recipes::insert_recipe(conn, &draft).map(StoreReply::Inserted)
        }
        StoreRequest::Delete(id) => recipes::delete_recipe(conn, id).map(StoreReply::Deleted),
    }
}

/// The set of in-flight tickets a screen is willing to receive. Replaced
/// screens drop their set, so their replies go unclaimed and get discarded by
/// the event loop instead of reaching a dead screen.
#[derive(Debug, Default)]
pub struct Subscriptions {
    active: HashSet<Ticket>,
}

impl Subscriptions {
    /// Start tracking a freshly submitted ticket.
    pub fn track(&mut self, ticket: Ticket) {
        self.active.insert(ticket);
    }

    /// Claim an arriving ticket. Returns `true` at most once per tracked
    /// ticket; everything else is a stale or foreign reply.
    pub fn claim(&mut self, ticket: Ticket) -> bool {
        self.active.remove(&ticket)
    }

    /// Drop every in-flight ticket, e.g. when the screen restarts its load.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    const REPLY_WAIT: Duration = Duration::from_secs(5);

    fn temp_store(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("recipe-book-worker-{}-{}", name, std::process::id()))
            .join("recipes.sqlite")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    fn draft(name: &str) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            ingredient: String::from("salt"),
            image: vec![9, 9, 9],
        }
    }

    #[test]
    fn test_pool_round_trips_insert_and_fetch() {
        let path = temp_store("round-trip");
        cleanup(&path);
        let (pool, handle, events) = StorePool::spawn(&path, 2).unwrap();

        let insert_ticket = handle.insert(draft("Pasta")).unwrap();
        let event = events.recv_timeout(REPLY_WAIT).unwrap();
        assert_eq!(event.ticket, insert_ticket);
        let inserted = match event.outcome.unwrap() {
            StoreReply::Inserted(recipe) => recipe,
            other => panic!("unexpected reply: {other:?}"),
        };
        assert!(inserted.id > 0);

        let fetch_ticket = handle.fetch_all().unwrap();
        let event = events.recv_timeout(REPLY_WAIT).unwrap();
        assert_eq!(event.ticket, fetch_ticket);
        match event.outcome.unwrap() {
            StoreReply::Recipes(recipes) => {
                assert_eq!(recipes.len(), 1);
                assert_eq!(recipes[0].name, "Pasta");
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        drop(handle);
        pool.join();
        cleanup(&path);
    }

    #[test]
    fn test_delete_of_absent_record_reports_false() {
        let path = temp_store("absent-delete");
        cleanup(&path);
        let (pool, handle, events) = StorePool::spawn(&path, 1).unwrap();

        let ghost = Recipe {
            id: 999,
            name: String::from("Ghost"),
            ingredient: String::new(),
            image: Vec::new(),
        };
        handle.delete(&ghost).unwrap();
        let event = events.recv_timeout(REPLY_WAIT).unwrap();
        match event.outcome.unwrap() {
            StoreReply::Deleted(removed) => assert!(!removed),
            other => panic!("unexpected reply: {other:?}"),
        }

        drop(handle);
        pool.join();
        cleanup(&path);
    }

    #[test]
    fn test_tickets_are_unique_per_submission() {
        let path = temp_store("tickets");
        cleanup(&path);
        let (pool, handle, events) = StorePool::spawn(&path, 1).unwrap();

        let first = handle.fetch_all().unwrap();
        let second = handle.fetch_all().unwrap();
        assert_ne!(first, second);

        events.recv_timeout(REPLY_WAIT).unwrap();
        events.recv_timeout(REPLY_WAIT).unwrap();
        drop(handle);
        pool.join();
        cleanup(&path);
    }

    #[test]
    fn test_cleared_subscriptions_leave_replies_unclaimed() {
        let path = temp_store("disposal");
        cleanup(&path);
        let (pool, handle, events) = StorePool::spawn(&path, 1).unwrap();

        let mut subs = Subscriptions::default();
        let ticket = handle.fetch_all().unwrap();
        subs.track(ticket);
        // The screen is torn down before the reply lands.
        subs.clear();

        let event = events.recv_timeout(REPLY_WAIT).unwrap();
        assert!(!subs.claim(event.ticket));

        drop(handle);
        pool.join();
        cleanup(&path);
    }

    #[test]
    fn test_claim_succeeds_at_most_once() {
        let mut subs = Subscriptions::default();
        let ticket = Ticket(7);
        subs.track(ticket);

        assert!(subs.claim(ticket));
        assert!(!subs.claim(ticket));
        assert!(!subs.claim(Ticket(8)));
    }
}
