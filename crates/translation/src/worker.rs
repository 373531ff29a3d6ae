use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use transcast_reconciler::{Reconciler, TranslationResult};

use crate::client::MtClient;

/// Long-running task that translates outstanding sentences into every
/// currently demanded target language. One instance per active room.
pub struct TranslationWorker {
    reconciler: Arc<Reconciler>,
    mt: Arc<dyn MtClient>,
    target_langs: DashMap<String, usize>,
    poll_interval: Duration,
    batch_cap: usize,
    stop: AtomicBool,
}

impl TranslationWorker {
    pub fn new(
        reconciler: Arc<Reconciler>,
        mt: Arc<dyn MtClient>,
        poll_interval: Duration,
        batch_cap: usize,
    ) -> Self {
        Self {
            reconciler,
            mt,
            target_langs: DashMap::new(),
            poll_interval,
            batch_cap,
            stop: AtomicBool::new(false),
        }
    }

    /// Increments the subscriber count for `lang`, ignored for the source
    /// language (never a translation target of itself).
    pub fn subscribe(&self, lang: &str) {
        if lang == self.reconciler.source_lang() {
            return;
        }
        *self.target_langs.entry(lang.to_string()).or_insert(0) += 1;
    }

    /// Decrements the subscriber count, removing the entry once it hits zero.
    pub fn unsubscribe(&self, lang: &str) {
        let Some(mut entry) = self.target_langs.get_mut(lang) else {
            return;
        };
        if *entry <= 1 {
            drop(entry);
            self.target_langs.remove(lang);
        } else {
            *entry -= 1;
        }
    }

    pub fn target_langs(&self) -> Vec<String> {
        self.target_langs.iter().map(|e| e.key().clone()).collect()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Spawns the poll loop as a tokio task.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.run().await })
    }

    async fn run(&self) {
        while !self.is_stopped() {
            let cycle_start = Instant::now();
            self.run_cycle().await;
            let elapsed = cycle_start.elapsed();
            if elapsed < self.poll_interval {
                tokio::time::sleep(self.poll_interval - elapsed).await;
            }
        }
    }

    /// One translation cycle: snapshot the queue, translate up to
    /// `batch_cap` outstanding sentences per language (oldest first), and
    /// submit whatever succeeded. A transport error skips that sentence
    /// for this cycle only; it is retried on the next pass.
    pub async fn run_cycle(&self) {
        let queue = match self.reconciler.poll_translation_queue() {
            Ok(q) => q,
            Err(err) => {
                warn!(%err, "failed to snapshot translation queue");
                return;
            }
        };

        for lang in self.target_langs() {
            let start = Instant::now();
            let mut results = Vec::new();

            for request in queue
                .iter()
                .filter(|r| !r.translated_langs.contains(&lang))
            {
                if results.len() >= self.batch_cap {
                    break;
                }
                match self
                    .mt
                    .translate(&request.sentence, self.reconciler.source_lang(), &lang)
                    .await
                {
                    Ok(translation) => results.push(TranslationResult {
                        line_idx: request.line_idx,
                        sent_idx: request.sent_idx,
                        sentence: request.sentence.clone(),
                        lang: lang.clone(),
                        translation,
                    }),
                    Err(err) => {
                        warn!(%err, lang = %lang, "machine translation call failed, retrying next cycle");
                    }
                }
            }

            if !results.is_empty() {
                let elapsed = start.elapsed();
                if let Err(err) = self.reconciler.submit_translation(results, elapsed) {
                    warn!(%err, "failed to submit translation results");
                }
            }
        }
    }
}
