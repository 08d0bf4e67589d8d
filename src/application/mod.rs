//! Application layer: the write-behind reconciliation cycle and its trigger.
//!
//! - [`reconciler::Reconciler`] - drains the cache, persists deltas, publishes reloads
//! - [`reconcile_worker::spawn_reconcile_worker`] - periodic, non-overlapping trigger

pub mod reconcile_worker;
pub mod reconciler;

pub use reconcile_worker::{ReconcileWorker, spawn_reconcile_worker};
pub use reconciler::{CycleOutcome, FailedIncrement, PersistSummary, ReconcilePhase, Reconciler};
