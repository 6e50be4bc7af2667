//! Transaction Module
//!
//! Submits compiled items to the store as all-or-nothing groups.
//!
//! ## Responsibilities
//! - Chunk items to the store's atomic-transaction limit
//! - Submit chunks sequentially, each as one transaction
//! - Report per-item outcomes and the committed count
//! - Stop at the first failed chunk when the batch is fail-fast
//! - Abandon undispatched chunks once cancelled
//!
//! Condition failures are reported, never retried here.

mod cancel;
mod executor;
mod outcome;

pub use cancel::CancelFlag;
pub use executor::BatchExecutor;
pub use outcome::{CommitReport, ItemOutcome, OutcomeStatus};
