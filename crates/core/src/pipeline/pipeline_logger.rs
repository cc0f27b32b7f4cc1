use std::collections::HashMap;
use std::time::Instant;

/// Stage name under which use cases report whole-frame processing time.
pub const FRAME_STAGE: &str = "frame";

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples use cases from specific output mechanisms so each caller can
/// observe pipeline behavior without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces tracked).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Frame rate smoothed over roughly the last 16 frames:
/// `fps = (15 * fps + 1 / t) / 16`, starting from 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameRateEstimator {
    fps: f64,
}

impl FrameRateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one frame that took `seconds`. Non-positive durations are
    /// ignored.
    pub fn update(&mut self, seconds: f64) -> f64 {
        if seconds > 0.0 {
            self.fps = (15.0 * self.fps + 1.0 / seconds) / 16.0;
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Running count and sum for one stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStats {
    pub count: usize,
    pub total: f64,
}

impl RunningStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn average(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// Logger backed by the `log` facade: throttled progress lines with the
/// smoothed frame rate, per-stage timings and a closing summary. Keeps one
/// running sum per name, so memory does not grow with stream length.
pub struct LogPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStats>,
    metrics: HashMap<String, RunningStats>,
    frame_rate: FrameRateEstimator,
    last_frame_ms: f64,
    start_time: Instant,
    total_frames: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            frame_rate: FrameRateEstimator::new(),
            last_frame_ms: 0.0,
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    pub fn fps(&self) -> f64 {
        self.frame_rate.fps()
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Pipeline summary ({} frames, {elapsed_s:.1}s total):",
            self.total_frames
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = self.timings[stage];
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  total {:7.0}ms",
                stats.average(),
                stats.total
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].average()));
        }

        lines.push(format!("  Smoothed FPS: {:.2}", self.frame_rate.fps()));
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStats> {
        self.metrics.get(name).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = total;
        if current % self.throttle_frames == 0 || current == total {
            log::info!(
                "Frame {current}/{total} | Total time: {:.5}s | FPS: {:.2}",
                self.last_frame_ms / 1000.0,
                self.frame_rate.fps()
            );
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        if stage == FRAME_STAGE {
            self.last_frame_ms = duration_ms;
            self.frame_rate.update(duration_ms / 1000.0);
        }
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
