//! Single consumer of worker reports: progress output and the summary.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::extract::PartOutcome;

use super::{Counters, ResultBatch, Summary, WorkerReport, QUIESCENCE_WINDOW};

/// Consume reports until the channel disconnects, the quiescence window
/// elapses with no traffic, or a fatal report arrives.
///
/// Batches are printed in arrival order, which interleaves workers but
/// keeps each message's lines together. A fatal report aborts the run
/// without a summary.
pub(crate) fn aggregate(
    reports: &Receiver<WorkerReport>,
    counters: &Counters,
    expected: u64,
    mailbox_total: u32,
    started: Instant,
) -> Result<Summary> {
    let bar = ProgressBar::new(expected);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Downloading [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    loop {
        match reports.recv_timeout(QUIESCENCE_WINDOW) {
            Ok(WorkerReport::Batch(batch)) => {
                print_batch(&bar, &batch);
                bar.inc(1);
            }
            Ok(WorkerReport::Fatal(err)) => {
                bar.finish_and_clear();
                return Err(err);
            }
            // Every worker hung up, or nothing arrived for the whole
            // window: the backlog is exhausted.
            Err(RecvTimeoutError::Disconnected) | Err(RecvTimeoutError::Timeout) => break,
        }
    }
    bar.finish_and_clear();

    let (messages, attachments) = counters.snapshot();
    let summary = Summary {
        mailbox_total,
        messages,
        attachments,
        elapsed: started.elapsed(),
    };
    print_summary(&summary);
    Ok(summary)
}

/// One line for the subject, then one line per reportable outcome.
fn print_batch(bar: &ProgressBar, batch: &ResultBatch) {
    bar.println(format!("- Message #{}: {}", batch.uid, batch.subject));

    let mut saved_any = false;
    for outcome in &batch.outcomes {
        match outcome {
            PartOutcome::Saved { path, size } => {
                saved_any = true;
                bar.println(format!(
                    "    saved {} ({})",
                    path.display(),
                    format_size(*size, BINARY)
                ));
            }
            PartOutcome::SaveError { filename, source } => {
                bar.println(format!("    cannot write '{filename}': {source}"));
            }
            PartOutcome::NoFilename => {}
        }
    }
    if !saved_any {
        bar.println("    no attachment");
    }
}

/// The closing block, printed on normal or cancelled completion.
pub(crate) fn print_summary(summary: &Summary) {
    println!();
    println!("  ----------------------------------------");
    println!("  Summary");
    println!("  ----------------------------------------");
    println!("  {:<28} {}", "Messages processed", summary.messages);
    println!("  {:<28} {}", "Attachments saved", summary.attachments);
    println!("  {:<28} {}", "Time taken", format_elapsed(summary.elapsed));
    println!();
}

/// `HH:MM:SS` rendering of the elapsed wall-clock time.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(360_000)), "100:00:00");
    }
}
