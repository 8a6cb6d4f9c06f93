//! # Performance Metrics
//!
//! Frame time tracking for the FPS counter. The monitor keeps a ring buffer of
//! recent frame durations and recomputes its averages a few times per second
//! so the displayed number stays readable.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use solaris::performance::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::with_config(120, Duration::ZERO);
//! monitor.record_frame(Duration::from_millis(20));
//! assert_eq!(monitor.fps(), 50);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::gfx::backend::Color;

/// Frame timing metrics
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    /// Current frames per second
    pub fps: f32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
}

/// Performance monitoring system
pub struct PerformanceMonitor {
    /// Ring buffer of recent frame times for averaging
    frame_times: VecDeque<Duration>,
    /// Maximum number of frame times to keep for averaging
    max_samples: usize,
    /// Current performance metrics
    current_metrics: PerformanceMetrics,
    /// Last time metrics were updated
    last_update: Option<Instant>,
    /// Update interval for metrics calculation
    update_interval: Duration,
}

impl PerformanceMonitor {
    /// Create a new performance monitor
    pub fn new() -> Self {
        // ~2 seconds at 60fps, refreshed 10 times per second
        Self::with_config(120, Duration::from_millis(100))
    }

    pub fn with_config(max_samples: usize, update_interval: Duration) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            current_metrics: PerformanceMetrics::default(),
            last_update: None,
            update_interval,
        }
    }

    /// Records the duration of one completed frame
    pub fn record_frame(&mut self, frame_time: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);

        let due = self
            .last_update
            .map_or(true, |last| last.elapsed() >= self.update_interval);
        if due {
            self.update_metrics();
            self.last_update = Some(Instant::now());
        }
    }

    fn update_metrics(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total_time: Duration = self.frame_times.iter().sum();
        let avg_frame_time = total_time / self.frame_times.len() as u32;
        let avg_frame_time_ms = avg_frame_time.as_secs_f32() * 1000.0;

        self.current_metrics.frame_time_ms = avg_frame_time_ms;
        self.current_metrics.fps = if avg_frame_time_ms > 0.0 {
            1000.0 / avg_frame_time_ms
        } else {
            0.0
        };
    }

    /// Rounded frames per second
    pub fn fps(&self) -> u32 {
        self.current_metrics.fps.round() as u32
    }

    /// The counter text: the rounded rate and nothing else
    pub fn overlay_text(&self) -> String {
        format!("{}", self.fps())
    }

    /// Draws the frame rate at `position` on top of everything else
    pub fn render_overlay(&self, ui: &imgui::Ui, position: [f32; 2]) {
        let [r, g, b, a] = Color::GREEN.to_array();
        ui.get_foreground_draw_list().add_text(
            position,
            imgui::ImColor32::from_rgba_f32s(r, g, b, a),
            self.overlay_text(),
        );
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_from_average_frame_time() {
        let mut monitor = PerformanceMonitor::with_config(4, Duration::ZERO);
        monitor.record_frame(Duration::from_millis(10));
        monitor.record_frame(Duration::from_millis(30));

        assert_eq!(monitor.fps(), 50);
        assert!((monitor.current_metrics.frame_time_ms - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_old_samples_fall_out() {
        let mut monitor = PerformanceMonitor::with_config(2, Duration::ZERO);
        monitor.record_frame(Duration::from_millis(100));
        monitor.record_frame(Duration::from_millis(20));
        monitor.record_frame(Duration::from_millis(20));

        assert_eq!(monitor.fps(), 50);
    }

    #[test]
    fn test_updates_are_throttled() {
        let mut monitor = PerformanceMonitor::with_config(8, Duration::from_secs(3600));
        monitor.record_frame(Duration::from_millis(20));
        monitor.record_frame(Duration::from_millis(5));

        // only the first sample was folded in
        assert_eq!(monitor.fps(), 50);
    }

    #[test]
    fn test_overlay_shows_only_the_number() {
        let mut monitor = PerformanceMonitor::with_config(8, Duration::ZERO);
        assert_eq!(monitor.overlay_text(), "0");

        monitor.record_frame(Duration::from_micros(16_667));
        assert_eq!(monitor.overlay_text(), "60");
    }
}
