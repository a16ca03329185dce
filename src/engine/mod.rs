//! Core engine — the fetch → format → reconcile cycle and its scheduler.

pub mod cycle;
pub mod pacer;
pub mod reconciler;
pub mod scheduler;
