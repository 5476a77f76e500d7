//! Batch preparation of paragraph audio.
//!
//! A fixed number of workers pull `(index, text)` pairs off a shared queue
//! until it is empty.  Results come back over a channel in completion order
//! and are written into a pre-sized vector, so the final queue is always in
//! paragraph order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::audio::AudioClip;
use crate::error::{ReaderError, Result};
use crate::fetch::{AudioItem, Fetcher};

/// Progress after one paragraph completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    /// Estimated time left; `None` once nothing remains.
    pub eta: Option<Duration>,
}

/// Prepared per-paragraph audio.  `None` marks a paragraph that failed.
#[derive(Debug, Clone)]
pub struct PreparedAudio {
    pub items: Arc<[Option<AudioItem>]>,
    pub failed_count: usize,
}

impl PreparedAudio {
    pub fn successful_count(&self) -> usize {
        self.items.len() - self.failed_count
    }

    /// All successful clips joined in paragraph order.
    pub fn export_clip(&self) -> Option<AudioClip> {
        AudioClip::concat(self.items.iter().flatten().map(|item| &item.clip))
    }
}

fn progress(completed: usize, total: usize, elapsed: Duration) -> BatchProgress {
    let remaining = total - completed;
    let eta = if completed == 0 || remaining == 0 {
        None
    } else {
        let per_item = elapsed.as_secs_f64() / completed as f64;
        let secs = (per_item * remaining as f64).round();
        (secs > 0.0).then(|| Duration::from_secs_f64(secs))
    };
    BatchProgress {
        completed,
        total,
        percent: completed as f64 / total.max(1) as f64 * 100.0,
        eta,
    }
}

/// Fetch every paragraph with at most `concurrency` requests in flight.
///
/// `on_progress` runs after each completion.  Individual failures are
/// counted; zero successes is [`ReaderError::BatchFailed`].
pub async fn prefetch_all<F>(
    fetcher: &Fetcher,
    paragraphs: &[String],
    concurrency: usize,
    mut on_progress: F,
) -> Result<PreparedAudio>
where
    F: FnMut(BatchProgress),
{
    let total = paragraphs.len();
    if total == 0 {
        return Err(ReaderError::EmptyDocument);
    }

    let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
        Arc::new(Mutex::new(paragraphs.iter().cloned().enumerate().collect()));
    let (tx, mut rx) = mpsc::channel::<(usize, Option<AudioItem>)>(total);

    let workers = concurrency.max(1);
    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let fetcher = fetcher.clone();
        let tx = tx.clone();
        pool.spawn(async move {
            loop {
                let next = match queue.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some((index, text)) = next else { break };
                tracing::debug!(worker, index, "fetching paragraph");
                let item = fetcher.fetch(&text).await;
                if tx.send((index, item)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let started = Instant::now();
    let mut items: Vec<Option<AudioItem>> = vec![None; total];
    let mut failed_count = 0;
    let mut completed = 0;

    while let Some((index, item)) = rx.recv().await {
        if item.is_none() {
            tracing::warn!(index, "paragraph failed and will be skipped");
            failed_count += 1;
        }
        items[index] = item;
        completed += 1;
        on_progress(progress(completed, total, started.elapsed()));
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(err) = joined {
            tracing::error!(error = %err, "prefetch worker panicked");
        }
    }

    // Paragraphs never reported (worker panic) count as failed.
    failed_count += total - completed;

    if failed_count == total {
        return Err(ReaderError::BatchFailed { total });
    }

    tracing::info!(total, failed = failed_count, "audio prepared");
    Ok(PreparedAudio { items: items.into(), failed_count })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
