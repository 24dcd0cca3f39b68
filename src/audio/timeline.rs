use std::time::Instant;

/// Clock arithmetic for a playback session: accumulates elapsed seconds
/// across pause/resume cycles against a monotonic clock. The current clock
/// reading is always passed in, so tests can drive simulated time.
#[derive(Debug)]
pub struct Timeline {
    duration: f64,
    paused_offset: f64,
    run_started: Option<Instant>,
}

impl Timeline {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            paused_offset: 0.0,
            run_started: None,
        }
    }

    /// Start (or resume) a run at `now`. Elapsed time stays continuous across
    /// the resume: the offset accumulated by prior runs is kept.
    pub fn begin(&mut self, now: Instant) {
        if self.run_started.is_none() {
            self.run_started = Some(now);
        }
    }

    /// Freeze the current offset and leave the active state. The stored
    /// offset is what the next `begin` resumes from.
    pub fn pause(&mut self, now: Instant) {
        if self.run_started.is_some() {
            self.paused_offset = self.position(now);
            self.run_started = None;
        }
    }

    /// Back to the initial state: inactive, offset zero.
    pub fn reset(&mut self) {
        self.paused_offset = 0.0;
        self.run_started = None;
    }

    /// Teardown after natural completion: inactive, and the offset is
    /// cleared so the next `begin` starts from the top.
    pub fn finish(&mut self) {
        self.reset();
    }

    pub fn is_active(&self) -> bool {
        self.run_started.is_some()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Current offset in seconds: frozen while paused, wall-clock-driven
    /// while active.
    pub fn position(&self, now: Instant) -> f64 {
        match self.run_started {
            Some(start) => self.paused_offset + now.saturating_duration_since(start).as_secs_f64(),
            None => self.paused_offset,
        }
    }

    /// Normalized progress in [0, 1].
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.position(now) / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.position(now) >= self.duration
    }
}

/// Format seconds as `m:ss`, truncating (not rounding) fractional seconds.
pub fn format_timestamp(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn t(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_fresh_timeline_is_inactive_at_zero() {
        let now = Instant::now();
        let timeline = Timeline::new(10.0);
        assert!(!timeline.is_active());
        assert_eq!(timeline.position(now), 0.0);
        assert_eq!(timeline.progress(now), 0.0);
    }

    #[test]
    fn test_position_advances_while_active() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        assert!(timeline.is_active());
        assert!((timeline.position(t(base, 4.0)) - 4.0).abs() < 1e-9);
        assert!((timeline.progress(t(base, 4.0)) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_pause_freezes_offset() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.pause(t(base, 3.0));
        assert!(!timeline.is_active());
        assert!((timeline.position(t(base, 99.0)) - 3.0).abs() < 1e-9);
        assert!((timeline.progress(t(base, 99.0)) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_resume_is_continuous_across_pause() {
        // play; pause at 3.0; resume at 3.5 wall-clock; 4.0s later the
        // offset is 7.0 -- no time double-counted or lost.
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.pause(t(base, 3.0));
        timeline.begin(t(base, 3.5));
        assert!((timeline.position(t(base, 7.5)) - 7.0).abs() < 1e-9);
        assert!((timeline.progress(t(base, 7.5)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_progress_clamps_at_one() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        assert_eq!(timeline.progress(t(base, 25.0)), 1.0);
        assert!(timeline.is_complete(t(base, 25.0)));
    }

    #[test]
    fn test_finish_restarts_from_zero() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.finish();
        assert!(!timeline.is_active());
        assert_eq!(timeline.position(t(base, 12.0)), 0.0);
        timeline.begin(t(base, 12.0));
        assert!((timeline.position(t(base, 13.0)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_after_any_sequence() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.pause(t(base, 2.0));
        timeline.begin(t(base, 5.0));
        timeline.reset();
        assert!(!timeline.is_active());
        assert_eq!(timeline.position(t(base, 6.0)), 0.0);
        assert_eq!(timeline.progress(t(base, 6.0)), 0.0);
    }

    #[test]
    fn test_pause_when_inactive_is_noop() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.pause(t(base, 3.0));
        timeline.pause(t(base, 8.0));
        assert!((timeline.position(t(base, 8.0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_begin_when_active_is_noop() {
        let base = Instant::now();
        let mut timeline = Timeline::new(10.0);
        timeline.begin(base);
        timeline.begin(t(base, 5.0));
        assert!((timeline.position(t(base, 6.0)) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_is_immediately_complete() {
        let now = Instant::now();
        let timeline = Timeline::new(0.0);
        assert_eq!(timeline.progress(now), 1.0);
    }

    #[test]
    fn test_format_timestamp_truncates() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(59.999), "0:59");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(600.0), "10:00");
        assert_eq!(format_timestamp(-3.0), "0:00");
    }
}
