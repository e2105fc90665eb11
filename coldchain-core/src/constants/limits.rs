//! Fixed-Capacity Limits
//!
//! All collections in the core are heapless; these constants bound them.
//! Capacities are powers of two where the underlying structure (index
//! maps, ring queues) requires it.

/// Maximum tracked sensors per engine instance.
///
/// Bounds the ingestion gate's ordering table and the escalation engine's
/// state table. One engine instance per depot or fleet segment.
pub const MAX_SENSORS: usize = 64;

/// Maximum concurrently scheduled escalation/hold timers.
///
/// Worst case is every tracked sensor holding one escalation deadline and
/// one resolve deadline.
pub const MAX_PENDING_TIMERS: usize = 128;

/// Default event queue capacity (must be a power of two).
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 64;

/// Maximum number of stages in a pipeline.
pub const MAX_PIPELINE_STAGES: usize = 8;

/// Maximum events a single stage may emit per input event.
pub const MAX_STAGE_OUTPUT: usize = 8;

/// Per-sensor rolling statistics window (readings retained).
pub const STATS_WINDOW_CAPACITY: usize = 32;
