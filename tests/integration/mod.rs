//! Integration tests for chain generation workflows.
//!
//! The generators here are hand-written fakes so the tests exercise the
//! public trait exactly as a host crate would implement it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod cancellation;
mod chain_workflow;
mod error_recovery;
mod storage_workflow;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deep_thinking::error::GenerationError;
use deep_thinking::search::StepRequest;
use deep_thinking::traits::StepGenerator;

/// Replays a script of steps, one per call, cycling at the end.
pub struct ScriptedGenerator {
    steps: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(steps: &[&str]) -> Self {
        Self {
            steps: steps.iter().map(|s| (*s).to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepGenerator for ScriptedGenerator {
    async fn generate_step(&self, _request: &StepRequest) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.steps[n % self.steps.len()].clone())
    }
}

/// Echoes the depth and path length so tests can inspect the context.
pub struct EchoGenerator;

#[async_trait]
impl StepGenerator for EchoGenerator {
    async fn generate_step(&self, request: &StepRequest) -> Result<String, GenerationError> {
        Ok(format!(
            "Step at depth {} after {} prior steps, then we continue",
            request.depth,
            request.path.len()
        ))
    }
}

/// Always fails with the same error.
pub struct FailingGenerator(pub GenerationError);

#[async_trait]
impl StepGenerator for FailingGenerator {
    async fn generate_step(&self, _request: &StepRequest) -> Result<String, GenerationError> {
        Err(self.0.clone())
    }
}

/// Sleeps before answering; the first `fast_calls` answer immediately.
pub struct SlowGenerator {
    pub fast_calls: usize,
    pub delay: Duration,
    calls: AtomicUsize,
}

impl SlowGenerator {
    pub const fn new(fast_calls: usize, delay: Duration) -> Self {
        Self {
            fast_calls,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepGenerator for SlowGenerator {
    async fn generate_step(&self, request: &StepRequest) -> Result<String, GenerationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fast_calls {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("We observe a pattern at depth {}", request.depth))
    }
}
