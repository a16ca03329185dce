//! Mutation pacing.
//!
//! Channel creates, renames and permission edits are spaced by a fixed
//! minimum gap so a cycle never bursts against the platform's rate limits.
//! Reads are not paced.

use std::time::Duration;
use tokio::time::Instant;

pub struct MutationPacer {
    delay: Duration,
    last: Option<Instant>,
    mutations: u64,
}

impl MutationPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None, mutations: 0 }
    }

    /// Wait until at least `delay` has passed since the previous mutation,
    /// then record this one.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            if !self.delay.is_zero() {
                tokio::time::sleep_until(last + self.delay).await;
            }
        }
        self.last = Some(Instant::now());
        self.mutations += 1;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Mutations recorded since creation.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }
}
