//! Worker threads: one private session each, draining the backlog.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::FetchError;
use crate::extract;
use crate::session::{MailboxSession, SessionFactory};

use super::backlog::Backlog;
use super::{CancelToken, Counters, ResultBatch, WorkerReport};

/// State handed to one worker thread.
pub(crate) struct Worker {
    pub id: usize,
    /// Mailbox name, already modified-UTF-7 encoded.
    pub mailbox: String,
    pub settings: Arc<Settings>,
    pub backlog: Arc<Backlog>,
    pub counters: Arc<Counters>,
    pub cancel: CancelToken,
    pub reports: Sender<WorkerReport>,
}

impl Worker {
    /// Connect, select, drain, stop.
    ///
    /// Connect and select failures are escalated as run-fatal: the run
    /// was feasibility-checked before workers were spawned, so failure
    /// here means a credentials or network problem that continuing with
    /// a silently reduced pool would mask.
    pub(crate) fn run<F: SessionFactory>(self, factory: &F) {
        let mut session = match factory.connect() {
            Ok(session) => session,
            Err(err) => return self.fatal(err),
        };

        if let Err(err) = session.select(&self.mailbox) {
            let _ = session.logout();
            return self.fatal(err);
        }

        if let Err(err) = self.drain(&mut session) {
            let _ = session.logout();
            return self.fatal(err);
        }

        if let Err(err) = session.logout() {
            warn!(worker = self.id, error = %err, "logout failed");
        }
        debug!(worker = self.id, "stopped");
    }

    /// The draining loop. Protocol errors bubble up as run-fatal; a
    /// local save failure stops this worker only, after the current
    /// message has been reported.
    fn drain<S: MailboxSession>(&self, session: &mut S) -> crate::error::Result<()> {
        while !self.cancel.is_cancelled() {
            let Some(uid) = self.backlog.pop() else { break };

            let raw = session.fetch_raw(uid)?;
            let extraction =
                extract::extract_message(&raw, &self.settings.dir, self.settings.skip_inline);

            let saved = extraction.saved_count();
            let clean = !extraction.has_save_error();

            let batch = ResultBatch {
                uid,
                subject: extraction.subject,
                outcomes: extraction.outcomes,
            };
            if self.reports.send(WorkerReport::Batch(batch)).is_err() {
                // Aggregator is gone; nothing left to report to.
                break;
            }
            self.counters.record(saved);

            if self.settings.delete && clean {
                session.delete(uid)?;
            }

            if !clean {
                // A failed local write points at the environment (disk
                // full, permissions); draining further identifiers
                // would keep losing attachments silently.
                warn!(worker = self.id, uid, "save failure, worker stops draining");
                break;
            }
        }
        Ok(())
    }

    fn fatal(&self, err: FetchError) {
        self.cancel.cancel();
        let _ = self.reports.send(WorkerReport::Fatal(err));
    }
}
