//! Performance monitor: frame timing, memory sampling, threshold alerts,
//! and heuristic tuning recommendations.
//!
//! The monitor is advisory only — it never blocks or aborts interaction. It
//! samples once per frame, keeps rolling statistics, and exposes a quality
//! hint the renderer may use to shed detail under load.

#[cfg(test)]
#[path = "perf_test.rs"]
mod perf_test;

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::{Value, json};

use crate::consts::{
    FPS_ERROR, FPS_WARN, FRAME_ERROR_MS, FRAME_WARN_MS, LEAK_GROWTH_RATIO, LEAK_LOOKBACK,
    LEAK_WINDOW, MEMORY_ERROR_BYTES, MEMORY_WARN_BYTES,
};

/// Supplies the runtime's heap usage indicator, when the host has one.
///
/// The default [`NullProbe`] reports zero, matching hosts without a usable
/// heap metric.
pub trait MemoryProbe {
    /// Current heap usage in bytes.
    fn heap_bytes(&self) -> u64;
}

/// Memory probe for hosts without heap introspection; always reports zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl MemoryProbe for NullProbe {
    fn heap_bytes(&self) -> u64 {
        0
    }
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Error,
}

/// Which metric crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Fps,
    Memory,
    FrameTime,
}

/// A threshold-crossing record. Advisory; never raised as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
    /// Milliseconds timestamp from the host clock.
    pub at: f64,
}

/// One row of rolling metrics history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSample {
    pub fps: u32,
    pub frame_ms: f64,
    pub memory_bytes: u64,
    pub at: f64,
}

/// Rendering quality hint derived from recent frame cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityLevel {
    #[default]
    High,
    /// Skip sub-grid and flow glyphs.
    Medium,
    /// Additionally coarsen curve sampling and skip labels.
    Low,
}

/// Frame-loop performance monitor.
pub struct PerfMonitor {
    probe: Box<dyn MemoryProbe + Send>,
    frame_count: u32,
    window_start_ms: Option<f64>,
    frame_begin_ms: Option<f64>,
    fps: u32,
    last_frame_ms: f64,
    history: VecDeque<MetricsSample>,
    memory_samples: VecDeque<u64>,
    alerts: Vec<Alert>,
    leak_warned: bool,
    session_started_ms: Option<f64>,
}

/// Cap on retained history rows and memory samples.
const HISTORY_CAP: usize = 120;

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new(Box::new(NullProbe))
    }
}

impl PerfMonitor {
    /// Create a monitor reading memory through `probe`.
    #[must_use]
    pub fn new(probe: Box<dyn MemoryProbe + Send>) -> Self {
        Self {
            probe,
            frame_count: 0,
            window_start_ms: None,
            frame_begin_ms: None,
            fps: 0,
            last_frame_ms: 0.0,
            history: VecDeque::new(),
            memory_samples: VecDeque::new(),
            alerts: Vec::new(),
            leak_warned: false,
            session_started_ms: None,
        }
    }

    /// Mark the start of a frame's render work.
    pub fn begin_frame(&mut self, now_ms: f64) {
        self.session_started_ms.get_or_insert(now_ms);
        self.window_start_ms.get_or_insert(now_ms);
        self.frame_begin_ms = Some(now_ms);
    }

    /// Mark the end of a frame's render work and take a sample.
    pub fn end_frame(&mut self, now_ms: f64) {
        if let Some(begin) = self.frame_begin_ms.take() {
            self.last_frame_ms = (now_ms - begin).max(0.0);
        }
        self.frame_count += 1;

        // Rolling 1-second FPS window.
        if let Some(start) = self.window_start_ms {
            let elapsed = now_ms - start;
            if elapsed >= 1000.0 {
                self.fps = (f64::from(self.frame_count) * 1000.0 / elapsed).round() as u32;
                self.frame_count = 0;
                self.window_start_ms = Some(now_ms);
                self.sample(now_ms);
            }
        }
    }

    /// Take a metrics sample and evaluate thresholds. Called automatically
    /// once per FPS window; may also be called directly.
    pub fn sample(&mut self, now_ms: f64) {
        let memory = self.probe.heap_bytes();
        self.memory_samples.push_back(memory);
        if self.memory_samples.len() > HISTORY_CAP {
            self.memory_samples.pop_front();
        }

        let row = MetricsSample {
            fps: self.fps,
            frame_ms: self.last_frame_ms,
            memory_bytes: memory,
            at: now_ms,
        };
        self.history.push_back(row);
        if self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        self.check_thresholds(row);
        self.check_leak(now_ms);
    }

    fn check_thresholds(&mut self, row: MetricsSample) {
        if row.fps > 0 && row.fps <= FPS_ERROR {
            self.push_alert(AlertKind::Error, Metric::Fps, f64::from(row.fps), f64::from(FPS_ERROR), row.at);
        } else if row.fps > 0 && row.fps <= FPS_WARN {
            self.push_alert(AlertKind::Warning, Metric::Fps, f64::from(row.fps), f64::from(FPS_WARN), row.at);
        }

        #[allow(clippy::cast_precision_loss)]
        let mem = row.memory_bytes as f64;
        if row.memory_bytes >= MEMORY_ERROR_BYTES {
            self.push_alert(AlertKind::Error, Metric::Memory, mem, MEMORY_ERROR_BYTES as f64, row.at);
        } else if row.memory_bytes >= MEMORY_WARN_BYTES {
            self.push_alert(AlertKind::Warning, Metric::Memory, mem, MEMORY_WARN_BYTES as f64, row.at);
        }

        if row.frame_ms >= FRAME_ERROR_MS {
            self.push_alert(AlertKind::Error, Metric::FrameTime, row.frame_ms, FRAME_ERROR_MS, row.at);
        } else if row.frame_ms >= FRAME_WARN_MS {
            self.push_alert(AlertKind::Warning, Metric::FrameTime, row.frame_ms, FRAME_WARN_MS, row.at);
        }
    }

    fn push_alert(&mut self, kind: AlertKind, metric: Metric, value: f64, threshold: f64, at: f64) {
        let message = match metric {
            Metric::Fps => format!("frame rate dropped to {value:.0} fps"),
            Metric::Memory => format!("heap usage at {:.0} MB", value / (1024.0 * 1024.0)),
            Metric::FrameTime => format!("frame took {value:.2} ms"),
        };
        self.alerts.push(Alert { kind, message, metric, value, threshold, at });
    }

    /// Leak heuristic: the mean of the most recent [`LEAK_WINDOW`] samples
    /// against the mean of the window [`LEAK_LOOKBACK`] samples back; warn
    /// once when recent exceeds older by more than [`LEAK_GROWTH_RATIO`].
    fn check_leak(&mut self, now_ms: f64) {
        if self.leak_warned || self.memory_samples.len() < LEAK_WINDOW + LEAK_LOOKBACK {
            return;
        }
        let samples: Vec<u64> = self.memory_samples.iter().copied().collect();
        let recent = mean(&samples[samples.len() - LEAK_WINDOW..]);
        let older_end = samples.len() - LEAK_LOOKBACK;
        let older = mean(&samples[older_end.saturating_sub(LEAK_WINDOW)..older_end]);
        if older > 0.0 && recent > older * LEAK_GROWTH_RATIO {
            log::warn!("possible memory leak: recent avg {recent:.0} B vs older avg {older:.0} B");
            self.push_alert(AlertKind::Warning, Metric::Memory, recent, older * LEAK_GROWTH_RATIO, now_ms);
            self.leak_warned = true;
        }
    }

    /// Most recent FPS reading (0 until the first full window elapses).
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Most recent per-frame render time in milliseconds.
    #[must_use]
    pub fn last_frame_ms(&self) -> f64 {
        self.last_frame_ms
    }

    /// All alerts raised so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Rolling metrics history, oldest first.
    #[must_use]
    pub fn history(&self) -> impl Iterator<Item = &MetricsSample> {
        self.history.iter()
    }

    /// Average FPS over the retained history (0 when empty).
    #[must_use]
    pub fn average_fps(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.history.iter().map(|s| f64::from(s.fps)).sum();
        #[allow(clippy::cast_precision_loss)]
        let n = self.history.len() as f64;
        sum / n
    }

    /// Heuristic tuning suggestions from rolling statistics.
    #[must_use]
    pub fn recommendations(&self, node_count: usize, culling_enabled: bool) -> Vec<String> {
        let mut out = Vec::new();
        let avg = self.average_fps();
        if avg > 0.0 && avg < f64::from(FPS_WARN) {
            out.push("average frame rate is low; reduce node count or simplify connection styles".to_owned());
        }
        if node_count > 100 && !culling_enabled {
            out.push("more than 100 nodes on canvas; enable viewport culling".to_owned());
        }
        if self.last_frame_ms >= FRAME_WARN_MS {
            out.push("render time exceeds the 60 Hz budget; lower curve sampling or disable the sub-grid".to_owned());
        }
        if self.leak_warned {
            out.push("heap usage is trending upward; check for leaked drawable handles".to_owned());
        }
        out
    }

    /// Quality hint for the renderer, derived from recent frame cost.
    #[must_use]
    pub fn quality(&self) -> QualityLevel {
        if self.fps > 0 && self.fps <= FPS_ERROR || self.last_frame_ms >= FRAME_ERROR_MS {
            QualityLevel::Low
        } else if self.fps > 0 && self.fps <= FPS_WARN || self.last_frame_ms >= FRAME_WARN_MS {
            QualityLevel::Medium
        } else {
            QualityLevel::High
        }
    }

    /// JSON-serializable performance report for the host application.
    #[must_use]
    pub fn export_report(&self, now_ms: f64, node_count: usize, culling_enabled: bool) -> Value {
        let history: Vec<&MetricsSample> = self.history.iter().collect();
        json!({
            "currentMetrics": {
                "fps": self.fps,
                "frameMs": self.last_frame_ms,
                "memoryBytes": self.memory_samples.back().copied().unwrap_or(0),
            },
            "history": history,
            "recommendations": self.recommendations(node_count, culling_enabled),
            "timestamp": now_ms,
            "sessionInfo": {
                "startedAt": self.session_started_ms,
                "durationMs": self.session_started_ms.map(|s| now_ms - s),
                "alertCount": self.alerts.len(),
            },
        })
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let sum = values.iter().sum::<u64>() as f64;
    sum / n
}
