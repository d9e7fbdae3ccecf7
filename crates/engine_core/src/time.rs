//! Frame timing driven by host-provided timestamps.

use std::time::Duration;

/// Tracks the delta between frame starts and how long each frame took to build.
///
/// The clock never reads the system time itself; the frame pump passes in the
/// timestamp of each display tick.
#[derive(Debug, Default)]
pub struct FrameClock {
    /// Start of the previous frame.
    last_start: Option<Duration>,
    /// Start of the frame in progress.
    current_start: Duration,
    /// Time between the last two frame starts.
    delta: Duration,
    /// CPU time spent inside the last completed frame.
    frame_cost: Duration,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a frame and return the delta time in seconds.
    /// The first frame has a delta of zero. Timestamps that go backwards also yield zero.
    pub fn begin(&mut self, timestamp: Duration) -> f32 {
        self.delta = match self.last_start {
            Some(last) if timestamp < last => {
                log::debug!("Frame timestamp went backwards ({:?} < {:?})", timestamp, last);
                Duration::ZERO
            }
            Some(last) => timestamp - last,
            None => Duration::ZERO,
        };
        self.last_start = Some(timestamp);
        self.current_start = timestamp;
        self.frame_count += 1;
        self.delta.as_secs_f32()
    }

    /// Mark the end of the frame started by the last [`FrameClock::begin`].
    pub fn end(&mut self, timestamp: Duration) {
        self.frame_cost = timestamp.saturating_sub(self.current_start);
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the cost of the last frame.
    pub fn frame_cost(&self) -> Duration {
        self.frame_cost
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_zero_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.begin(Duration::from_millis(500)), 0.0);
        assert_eq!(clock.fps(), 0.0);
    }

    #[test]
    fn delta_is_difference_between_frame_starts() {
        let mut clock = FrameClock::new();
        clock.begin(Duration::from_millis(100));
        clock.end(Duration::from_millis(104));
        let dt = clock.begin(Duration::from_millis(125));
        assert!((dt - 0.025).abs() < 1e-6);
        assert!((clock.fps() - 40.0).abs() < 1e-2);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn frame_cost_measured_from_begin() {
        let mut clock = FrameClock::new();
        clock.begin(Duration::from_millis(10));
        clock.end(Duration::from_millis(13));
        assert_eq!(clock.frame_cost(), Duration::from_millis(3));
    }

    #[test]
    fn backwards_timestamp_clamps_to_zero() {
        let mut clock = FrameClock::new();
        clock.begin(Duration::from_secs(2));
        assert_eq!(clock.begin(Duration::from_secs(1)), 0.0);
    }
}
