//! Staged Event Processing Pipeline
//!
//! Events flow through a fixed sequence of stages:
//!
//! ```text
//! connectors → queue → Validation → Threshold → Escalation → queue → fan-out
//! ```
//!
//! Each stage consumes the event kinds it owns and passes everything
//! else through unchanged, so stages compose without knowing about each
//! other. The pipeline owns input and output queues, per-stage metrics,
//! and a `tick` entry point that drives the escalation timers and
//! liveness watchdog between batches.
//!
//! Module layout:
//! - this file: stage trait, output buffer, errors, metrics
//! - [`stages`]: the built-in validation/threshold/escalation stages
//! - [`builder`]: pipeline construction and the batch loop

pub mod builder;
pub mod stages;

pub use builder::{Pipeline, PipelineBuilder};
pub use stages::{EscalationStage, FilterStage, ThresholdStage, ValidationStage};

use heapless::Vec;
use thiserror_no_std::Error;

use crate::constants::limits::MAX_STAGE_OUTPUT;
use crate::events::Event;
use crate::time::Timestamp;

/// Pipeline processing failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage's output buffer overflowed; excess events were dropped.
    #[error("stage {stage} output buffer full")]
    StageOutputFull {
        /// Index of the overflowing stage.
        stage: usize,
    },
    /// The output queue was full.
    #[error("output queue full")]
    QueueFull,
    /// Invalid pipeline configuration.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// What to do with new events when the input queue is full.
#[derive(Debug, Clone, Copy)]
pub enum BackpressureStrategy {
    /// Evict the oldest queued event to make room.
    DropOldest,
    /// Drop the incoming event.
    DropNewest,
}

/// Per-stage counters for monitoring.
pub struct PipelineMetrics {
    /// Events processed per stage.
    pub events_processed: [u32; crate::constants::limits::MAX_PIPELINE_STAGES],
    /// Events dropped per stage (output overflow).
    pub events_dropped: [u32; crate::constants::limits::MAX_PIPELINE_STAGES],
    /// Current input queue depth.
    pub current_depth: u16,
}

impl PipelineMetrics {
    /// Zeroed metrics.
    pub const fn new() -> Self {
        Self {
            events_processed: [0; crate::constants::limits::MAX_PIPELINE_STAGES],
            events_dropped: [0; crate::constants::limits::MAX_PIPELINE_STAGES],
            current_depth: 0,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity buffer a stage emits into.
pub struct StageOutput {
    events: Vec<Event, MAX_STAGE_OUTPUT>,
}

impl StageOutput {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event. Returns false when the buffer is full.
    pub fn push(&mut self, event: Event) -> bool {
        self.events.push(event).is_ok()
    }

    /// Take all buffered events, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<Event, MAX_STAGE_OUTPUT> {
        core::mem::take(&mut self.events)
    }

    /// Current event count.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the buffer is full.
    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// A single processing stage.
///
/// `process` is called once per event with the reference clock; `tick`
/// is called on the pipeline's timer cadence, independent of event
/// arrival, so timed transitions progress when sensors go silent.
pub trait PipelineStage: Send {
    /// Process one event, emitting zero or more events into `output`.
    fn process(
        &mut self,
        event: Event,
        output: &mut StageOutput,
        now: Timestamp,
    ) -> PipelineResult<()>;

    /// Advance time-driven state. Default: nothing to do.
    fn tick(&mut self, _now: Timestamp, _output: &mut StageOutput) {}

    /// Stage name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Clear intermediate state. Default: stateless.
    fn reset(&mut self) {}
}
