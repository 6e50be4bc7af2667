//! Parallel Batch Reader
//!
//! Fetches many named key groups concurrently and tags each result with
//! its logical name, so callers reassemble by name rather than position.
//!
//! ## Concurrency
//! One scoped thread per logical name; all are joined before returning.
//! Completion order is unspecified. A failed group does not stop the
//! others unless [`FetchMode::FailFast`] is requested, in which case the
//! remaining groups stop before their next store request.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{ParkError, Result};
use crate::item::{Item, Key};
use crate::store::Store;
use crate::transaction::CancelFlag;

/// Failure policy across groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Record each group's failure and keep going
    #[default]
    CollectAll,

    /// First failure stops the rest and is returned as the error
    FailFast,
}

/// Result for one logical name
#[derive(Debug)]
pub struct FetchResult {
    pub name: String,
    pub outcome: Result<Vec<Item>>,
}

impl FetchResult {
    /// Items fetched, empty on failure
    pub fn items(&self) -> &[Item] {
        self.outcome.as_deref().unwrap_or(&[])
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Concurrent batch reader
pub struct BatchReader<'a> {
    store: &'a dyn Store,

    /// Keys per underlying batch-get request
    chunk_size: usize,
}

impl<'a> BatchReader<'a> {
    pub fn new(store: &'a dyn Store, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Fetch every group; results come back in name order
    pub fn fetch(
        &self,
        table: &str,
        requests: BTreeMap<String, Vec<Key>>,
        mode: FetchMode,
    ) -> Result<Vec<FetchResult>> {
        let stop = CancelFlag::new();

        let mut results = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .into_iter()
                .map(|(name, keys)| {
                    let stop = &stop;
                    let tag = name.clone();
                    let handle = scope.spawn(move |_| {
                        let outcome = self.fetch_group(table, &keys, stop);
                        if outcome.is_err() && mode == FetchMode::FailFast {
                            stop.cancel();
                        }
                        FetchResult { name, outcome }
                    });
                    (tag, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle.join().unwrap_or_else(|_| FetchResult {
                        name,
                        outcome: Err(ParkError::Store("batch fetch worker panicked".to_string())),
                    })
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| ParkError::Store("batch fetch scope panicked".to_string()))?;

        if mode == FetchMode::FailFast {
            // Report the root failure, not the groups it stopped
            let first = results
                .iter()
                .position(|r| matches!(r.outcome, Err(ref e) if !matches!(e, ParkError::Cancelled { .. })))
                .or_else(|| results.iter().position(|r| r.outcome.is_err()));
            if let Some(index) = first {
                let FetchResult { name, outcome } = results.swap_remove(index);
                if let Err(error) = outcome {
                    warn!(table, name = %name, error = %error, "batch fetch failed fast");
                    return Err(error);
                }
                results.push(FetchResult { name, outcome });
                results.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }

        debug!(table, groups = results.len(), "batch fetch complete");
        Ok(results)
    }

    /// Fetch one group in store-sized chunks
    fn fetch_group(&self, table: &str, keys: &[Key], stop: &CancelFlag) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(keys.len());
        for (index, chunk) in keys.chunks(self.chunk_size).enumerate() {
            if stop.is_cancelled() {
                let completed = index * self.chunk_size;
                return Err(ParkError::Cancelled {
                    completed,
                    remaining: keys.len() - completed,
                });
            }
            // Missing keys are omitted from the result
            items.extend(self.store.batch_get(table, chunk)?.into_iter().flatten());
        }
        Ok(items)
    }
}
