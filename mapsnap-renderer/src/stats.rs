//! Render outcome counters.

use std::time::Duration;

/// Counters kept by a [`SurfaceRenderer`](crate::SurfaceRenderer).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Render calls that returned a frame, with or without a bitmap.
    pub renders: u64,
    /// Renders where the map engine reported failure.
    pub failed_renders: u64,
    /// Renders where read-back or conversion failed after a successful draw.
    pub readback_failures: u64,
    pub map_invalidations: u64,
    pub bookmark_invalidations: u64,
    /// Terminate + initialize cycles performed by the context manager.
    pub context_recoveries: u64,
    /// Total time spent in render calls.
    pub render_time: Duration,
}

impl RenderStats {
    /// Renders that produced a bitmap.
    pub fn bitmaps(&self) -> u64 {
        self.renders
            .saturating_sub(self.failed_renders)
            .saturating_sub(self.readback_failures)
    }

    /// Mean duration of a render call.
    pub fn average_render_time(&self) -> Duration {
        match u32::try_from(self.renders) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.render_time / n,
            Err(_) => Duration::from_secs_f64(self.render_time.as_secs_f64() / self.renders as f64),
        }
    }

    /// One-line summary for end-of-run logs.
    pub fn format_summary(&self) -> String {
        format!(
            "{} renders ({} bitmaps, {} engine failures, {} read-back failures), avg {:.1} ms; \
             invalidations: {} map, {} bookmark; {} context recoveries",
            self.renders,
            self.bitmaps(),
            self.failed_renders,
            self.readback_failures,
            self.average_render_time().as_secs_f64() * 1000.0,
            self.map_invalidations,
            self.bookmark_invalidations,
            self.context_recoveries,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let stats = RenderStats {
            renders: 4,
            failed_renders: 1,
            readback_failures: 1,
            map_invalidations: 2,
            bookmark_invalidations: 0,
            context_recoveries: 1,
            render_time: Duration::from_millis(40),
        };
        assert_eq!(stats.bitmaps(), 2);
        assert_eq!(stats.average_render_time(), Duration::from_millis(10));
        assert_eq!(
            stats.format_summary(),
            "4 renders (2 bitmaps, 1 engine failures, 1 read-back failures), avg 10.0 ms; \
             invalidations: 2 map, 0 bookmark; 1 context recoveries"
        );
    }

    #[test]
    fn test_empty_stats() {
        let stats = RenderStats::default();
        assert_eq!(stats.bitmaps(), 0);
        assert_eq!(stats.average_render_time(), Duration::ZERO);
    }
}
