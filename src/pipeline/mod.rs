//! The concurrent fetch-and-extract pipeline.
//!
//! [`run`] wires the pieces together: one lister pass fills the backlog,
//! worker threads drain it (one private session each), and the calling
//! thread aggregates their result batches into progress output and the
//! final summary.

pub mod aggregator;
pub mod backlog;
pub mod lister;
pub mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::extract::PartOutcome;
use crate::session::utf7::encode_mailbox_name;
use crate::session::{MailboxSession, SessionFactory};

use backlog::Backlog;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 10;

/// How long the aggregator waits for another batch before concluding the
/// backlog is exhausted and every worker has stopped.
pub(crate) const QUIESCENCE_WINDOW: Duration = Duration::from_secs(5);

/// Broadcast cancellation flag.
///
/// Set by the signal handler or by the first worker to hit a fatal
/// error; checked by every worker between message iterations, never
/// mid-write.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying flag, for wiring up signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Run totals, mutated by every worker under a single lock.
#[derive(Debug, Default)]
pub struct Counters {
    /// (messages processed, attachments saved)
    totals: Mutex<(u64, u64)>,
}

impl Counters {
    /// Record one processed message and the attachments it saved.
    pub fn record(&self, attachments_saved: u64) {
        let mut totals = self.totals.lock().unwrap();
        totals.0 += 1;
        totals.1 += attachments_saved;
    }

    /// Read both counters. Only meaningful once the workers have stopped.
    pub fn snapshot(&self) -> (u64, u64) {
        *self.totals.lock().unwrap()
    }
}

/// One message's worth of results, moved from a worker to the aggregator.
#[derive(Debug)]
pub struct ResultBatch {
    pub uid: u32,
    pub subject: String,
    pub outcomes: Vec<PartOutcome>,
}

/// Everything a worker can tell the aggregator.
#[derive(Debug)]
pub enum WorkerReport {
    Batch(ResultBatch),
    /// A run-level failure; aggregation stops and no summary is printed.
    Fatal(FetchError),
}

/// Final numbers for a completed (or cancelled) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Messages present in the mailbox at selection time.
    pub mailbox_total: u32,
    /// Messages actually processed.
    pub messages: u64,
    /// Attachments written to disk.
    pub attachments: u64,
    pub elapsed: Duration,
}

/// Execute the whole pipeline with sessions from `factory`.
///
/// Returns the summary on normal or cancelled completion. Fatal
/// conditions (connect, login, select, protocol) abort the run with the
/// first error reported by any component.
pub fn run<F: SessionFactory>(
    settings: &Arc<Settings>,
    factory: &Arc<F>,
    cancel: &CancelToken,
) -> Result<Summary> {
    let started = Instant::now();
    let mailbox = encode_mailbox_name(&settings.mailbox);

    // Feasibility pass: one session selects the mailbox and lists UIDs.
    // Workers are only spawned once this has succeeded.
    let mut session = factory.connect()?;
    let listing = lister::list_uids(&mut session, &mailbox, settings.max_messages);
    if let Err(err) = session.logout() {
        debug!(error = %err, "lister logout failed");
    }
    let (uids, mailbox_total) = listing?;

    info!(
        mailbox = %settings.mailbox,
        total = mailbox_total,
        queued = uids.len(),
        "mailbox listed"
    );

    if uids.is_empty() {
        println!("- No messages found in '{}'", settings.mailbox);
        let summary = Summary {
            mailbox_total,
            messages: 0,
            attachments: 0,
            elapsed: started.elapsed(),
        };
        aggregator::print_summary(&summary);
        return Ok(summary);
    }

    println!(
        "- {} message(s) in '{}', downloading {}",
        mailbox_total,
        settings.mailbox,
        uids.len()
    );

    let expected = uids.len() as u64;
    let backlog = Arc::new(Backlog::new(uids));
    let counters = Arc::new(Counters::default());
    let (tx, rx) = mpsc::channel::<WorkerReport>();

    let mut handles = Vec::with_capacity(settings.workers);
    for id in 0..settings.workers {
        let worker = worker::Worker {
            id,
            mailbox: mailbox.clone(),
            settings: Arc::clone(settings),
            backlog: Arc::clone(&backlog),
            counters: Arc::clone(&counters),
            cancel: cancel.clone(),
            reports: tx.clone(),
        };
        let factory = Arc::clone(factory);
        handles.push(thread::spawn(move || worker.run(factory.as_ref())));
    }
    // The aggregator must see the channel close once the workers finish.
    drop(tx);

    let outcome = aggregator::aggregate(&rx, &counters, expected, mailbox_total, started);

    for handle in handles {
        let _ = handle.join();
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_broadcasts() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_counters_accumulate_under_one_lock() {
        let counters = Arc::new(Counters::default());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = Arc::clone(&counters);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    counters.record(2);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot(), (800, 1600));
    }
}
