//! # RONDO Game Loop
//!
//! Frame orchestration over a registry and its two standard handlers:
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. STEP                                                      │
//! │    ├─ Apply spawns/kills staged since the last frame         │
//! │    ├─ Run step callbacks in priority order                   │
//! │    └─ Apply spawns/kills staged by step callbacks            │
//! │                                                              │
//! │ 2. DRAW                                                      │
//! │    └─ Same, with draw callbacks                              │
//! │                                                              │
//! │ 3. END FRAME                                                 │
//! │    └─ Record timing, warn on slow frames                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use rondo_core::{EngineResult, Handler, Registry, Released, TeardownReport, TemplateIndex};

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Maximum allowed frame time before warning.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(33);

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Step handler time in microseconds.
    pub step_us: u64,
    /// Draw handler time in microseconds.
    pub draw_us: u64,
    /// Callbacks that failed this frame.
    pub failures: usize,
    /// Live instances at the end of the frame.
    pub alive: usize,
}

/// What [`GameLoop::shutdown`] released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Released by the `step` handler.
    pub step: Released,
    /// Released by the `draw` handler.
    pub draw: Released,
    /// Outcome of the registry teardown.
    pub teardown: TeardownReport,
}

/// The main game loop orchestrator.
///
/// Owns the registry and the `step` and `draw` handlers, both ordered by
/// the same priority function.
pub struct GameLoop {
    registry: Registry,
    step: Handler,
    draw: Handler,
    frame_count: u64,
    stats: FrameStatsAccumulator,
}

impl GameLoop {
    /// Creates a game loop over `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry with every template already registered
    /// * `priority` - Dispatch priority per template, lower runs first
    ///
    /// # Errors
    ///
    /// Returns [`rondo_core::EngineError::Allocation`] if a handler cannot
    /// be allocated.
    pub fn new(mut registry: Registry, priority: fn(TemplateIndex) -> i32) -> EngineResult<Self> {
        let step = Handler::with_priority(&mut registry, priority)?;
        let draw = Handler::with_priority(&mut registry, priority)?;
        Ok(Self {
            registry,
            step,
            draw,
            frame_count: 0,
            stats: FrameStatsAccumulator::new(),
        })
    }

    /// Runs one frame: `step`, then `draw`.
    ///
    /// # Errors
    ///
    /// Propagates any error from either handler's run. The frame is not
    /// counted in that case.
    pub fn tick(&mut self) -> EngineResult<FrameStats> {
        let start = Instant::now();
        let step_failures = self.step.run(&mut self.registry)?;
        let step_done = Instant::now();
        let draw_failures = self.draw.run(&mut self.registry)?;
        let end = Instant::now();

        let stats = FrameStats {
            frame: self.frame_count,
            total_us: micros(end - start),
            step_us: micros(step_done - start),
            draw_us: micros(end - step_done),
            failures: step_failures + draw_failures,
            alive: self.registry.alive_count(),
        };
        self.end_frame(stats);
        Ok(stats)
    }

    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats.record(stats);

        if stats.total_us > micros(MAX_FRAME_TIME) {
            warn!(
                "frame {} exceeded budget: {}us (target: {}us)",
                stats.frame,
                stats.total_us,
                micros(TARGET_FRAME_TIME)
            );
        }
    }

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the registry mutably, for spawning between frames.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Returns the `step` handler, for binding callbacks.
    pub fn step_mut(&mut self) -> &mut Handler {
        &mut self.step
    }

    /// Returns the `draw` handler, for binding callbacks.
    pub fn draw_mut(&mut self) -> &mut Handler {
        &mut self.draw
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// Destroys both handlers, then tears the registry down.
    #[must_use = "the report says what was destroyed"]
    pub fn shutdown(mut self) -> ShutdownReport {
        let step = self.step.destroy();
        let draw = self.draw.destroy();
        debug!(
            "handlers destroyed: step {}/{} and draw {}/{} active/pending released",
            step.active, step.pending, draw.active, draw.pending
        );
        ShutdownReport {
            step,
            draw,
            teardown: self.registry.teardown(),
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of step times.
    pub step_us_sum: u64,
    /// Sum of draw times.
    pub draw_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
    /// Callback failures across all frames.
    pub failures: usize,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            step_us_sum: 0,
            draw_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            failures: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum = self.total_us_sum.saturating_add(stats.total_us);
        self.step_us_sum = self.step_us_sum.saturating_add(stats.step_us);
        self.draw_us_sum = self.draw_us_sum.saturating_add(stats.draw_us);
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);
        self.failures += stats.failures;

        if stats.total_us > micros(TARGET_FRAME_TIME) {
            self.frames_over_budget += 1;
        }
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns the share of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary of the statistics.
    pub fn log_summary(&self) {
        info!(
            "{} frames, avg {:.3} ms, min {} us, max {} us, {:.1}% over budget, {} callback failures",
            self.frames_recorded,
            self.avg_frame_ms(),
            if self.frames_recorded == 0 { 0 } else { self.min_frame_us },
            self.max_frame_us,
            self.over_budget_ratio() * 100.0,
            self.failures
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
