//! Pipeline Construction and the Batch Loop
//!
//! [`Pipeline<N>`] owns the stage chain plus input/output queues sized
//! `N`. Events are pushed in (typically by a connector receive loop),
//! processed in bounded batches, and drained from the output queue by
//! the notification fan-out. `tick(now)` runs the stages' timer logic
//! between batches.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

use heapless::Vec;

use crate::constants::limits::{MAX_PIPELINE_STAGES, MAX_STAGE_OUTPUT};
use crate::events::Event;
use crate::queue::EventQueue;
use crate::time::Timestamp;

use super::{
    BackpressureStrategy, PipelineMetrics, PipelineResult, PipelineStage, StageOutput,
};

/// Staged event pipeline with `N`-slot input and output queues.
///
/// All storage is fixed at construction; processing allocates nothing.
pub struct Pipeline<const N: usize> {
    stages: Vec<Box<dyn PipelineStage>, MAX_PIPELINE_STAGES>,
    input_queue: EventQueue<N>,
    output_queue: EventQueue<N>,
    backpressure: BackpressureStrategy,
    metrics: PipelineMetrics,
}

impl<const N: usize> Pipeline<N> {
    /// Start building a pipeline.
    pub fn builder() -> PipelineBuilder<N> {
        PipelineBuilder::new()
    }

    /// Push an event into the pipeline, applying the backpressure
    /// strategy when the input queue is full.
    pub fn push_event(&mut self, event: Event) -> bool {
        if self.input_queue.push(event.clone()) {
            return true;
        }
        match self.backpressure {
            BackpressureStrategy::DropOldest => {
                let _ = self.input_queue.pop();
                self.input_queue.push(event)
            }
            BackpressureStrategy::DropNewest => false,
        }
    }

    /// Process up to `max_events` events from the input queue through
    /// every stage at reference time `now`. Returns the number of input
    /// events consumed.
    pub fn process_batch(&mut self, max_events: usize, now: Timestamp) -> PipelineResult<usize> {
        let mut processed = 0;
        let mut stage_output = StageOutput::new();

        for _ in 0..max_events {
            let Some(event) = self.input_queue.pop() else {
                break;
            };

            let mut current: Vec<Event, MAX_STAGE_OUTPUT> = Vec::new();
            // Fresh buffer, push cannot fail
            let _ = current.push(event);

            for (stage_idx, stage) in self.stages.iter_mut().enumerate() {
                let mut next: Vec<Event, MAX_STAGE_OUTPUT> = Vec::new();

                for event in current {
                    stage.process(event, &mut stage_output, now)?;
                    for out in stage_output.take() {
                        if next.push(out).is_err() {
                            self.metrics.events_dropped[stage_idx] += 1;
                        }
                    }
                    self.metrics.events_processed[stage_idx] += 1;
                }

                current = next;
                if current.is_empty() {
                    break;
                }
            }

            for event in current {
                if !self.output_queue.push(event) {
                    self.metrics.events_dropped[self.stages.len().min(MAX_PIPELINE_STAGES - 1)] +=
                        1;
                }
            }

            processed += 1;
        }

        self.metrics.current_depth = self.input_queue.len() as u16;
        Ok(processed)
    }

    /// Drive time-based stage logic (hold timers, liveness watchdog).
    /// Emitted events go straight to the output queue.
    pub fn tick(&mut self, now: Timestamp) {
        let mut stage_output = StageOutput::new();
        for (stage_idx, stage) in self.stages.iter_mut().enumerate() {
            stage.tick(now, &mut stage_output);
            for event in stage_output.take() {
                if !self.output_queue.push(event) {
                    self.metrics.events_dropped[stage_idx] += 1;
                }
            }
        }
    }

    /// Pop the next processed event.
    pub fn pop_result(&mut self) -> Option<Event> {
        self.output_queue.pop()
    }

    /// Pipeline metrics.
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Reset all stages and metrics.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.metrics = PipelineMetrics::new();
    }

    /// Current input queue depth.
    pub fn input_depth(&self) -> usize {
        self.input_queue.len()
    }

    /// Current output queue depth.
    pub fn output_depth(&self) -> usize {
        self.output_queue.len()
    }

    /// Access a stage by index, for queries against stage state.
    pub fn stage(&self, index: usize) -> Option<&dyn PipelineStage> {
        self.stages.get(index).map(|s| s.as_ref())
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder<const N: usize> {
    stages: Vec<Box<dyn PipelineStage>, MAX_PIPELINE_STAGES>,
    backpressure: BackpressureStrategy,
}

impl<const N: usize> PipelineBuilder<N> {
    /// New builder with no stages.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            backpressure: BackpressureStrategy::DropOldest,
        }
    }

    /// Append a stage. Stages past the fixed maximum are ignored.
    pub fn add_stage<S: PipelineStage + 'static>(mut self, stage: S) -> Self {
        let _ = self.stages.push(Box::new(stage));
        self
    }

    /// Set the backpressure strategy.
    pub fn backpressure(mut self, strategy: BackpressureStrategy) -> Self {
        self.backpressure = strategy;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Pipeline<N> {
        Pipeline {
            stages: self.stages,
            input_queue: EventQueue::new(),
            output_queue: EventQueue::new(),
            backpressure: self.backpressure,
            metrics: PipelineMetrics::new(),
        }
    }
}

impl<const N: usize> Default for PipelineBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}
