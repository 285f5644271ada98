//! Adaptive blink detection against a rolling EAR baseline.
//!
//! Each frame's mean EAR is compared with the mean of the last N samples. A
//! drop of more than `blink_threshold` (relative) marks the eye as closed.
//! Counting is edge-triggered: a blink is recorded on the open→closed
//! transition only, and the detector re-arms once EAR recovers to the
//! baseline. A relative threshold tolerates per-subject and per-camera EAR
//! differences without calibration.

use std::collections::VecDeque;

use crate::config::LivenessConfig;

/// Bounded FIFO of recent EAR samples.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl RollingHistory {
    /// `capacity` must be non-zero; [`LivenessConfig::validate`] enforces this.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, sample: f32) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Mean of the current contents, recomputed on every call.
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Classification of a single frame by the blink detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkEvent {
    /// Eye just closed; the blink counter was incremented.
    Onset,
    /// Eye remains closed within the same blink.
    StillClosed,
    /// Eye open (at or above threshold); detector armed.
    Open,
}

/// Stateful blink counter for one liveness session.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    history: RollingHistory,
    blink_threshold: f32,
    baseline_excludes_current: bool,
    is_blinking: bool,
    last_blink_ms: Option<u64>,
    blink_count: u32,
}

impl BlinkDetector {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            history: RollingHistory::new(config.rolling_average_count),
            blink_threshold: config.blink_threshold,
            baseline_excludes_current: config.baseline_excludes_current,
            is_blinking: false,
            last_blink_ms: None,
            blink_count: 0,
        }
    }

    /// Feed one frame's per-eye EAR values.
    pub fn update(&mut self, left_ear: f32, right_ear: f32, now_ms: u64) -> BlinkEvent {
        let avg_ear = (left_ear + right_ear) / 2.0;

        let baseline = if self.baseline_excludes_current {
            let prior = self.history.mean().unwrap_or(avg_ear);
            self.history.push(avg_ear);
            prior
        } else {
            self.history.push(avg_ear);
            self.history.mean().unwrap_or(avg_ear)
        };

        let closed = avg_ear < baseline * (1.0 - self.blink_threshold);
        tracing::trace!(avg_ear, baseline, closed, "blink update");

        match (closed, self.is_blinking) {
            (true, false) => {
                self.is_blinking = true;
                self.last_blink_ms = Some(now_ms);
                self.blink_count += 1;
                tracing::debug!(blink_count = self.blink_count, avg_ear, baseline, "blink detected");
                BlinkEvent::Onset
            }
            (true, true) => BlinkEvent::StillClosed,
            (false, _) => {
                self.is_blinking = false;
                BlinkEvent::Open
            }
        }
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn is_blinking(&self) -> bool {
        self.is_blinking
    }

    /// Timestamp of the most recent blink onset, if any.
    pub fn last_blink_ms(&self) -> Option<u64> {
        self.last_blink_ms
    }

    /// Milliseconds since the last blink onset. A clock that stepped
    /// backwards yields zero.
    pub fn since_last_blink(&self, now_ms: u64) -> Option<u64> {
        self.last_blink_ms.map(|t| now_ms.saturating_sub(t))
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn rolling_average(&self) -> Option<f32> {
        self.history.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OPEN: f32 = 0.30;
    const CLOSED: f32 = 0.10;

    fn detector() -> BlinkDetector {
        BlinkDetector::new(&LivenessConfig::default())
    }

    /// Feed `n` open frames starting at `t`, 100 ms apart. Returns next timestamp.
    fn feed_open(d: &mut BlinkDetector, n: usize, mut t: u64) -> u64 {
        for _ in 0..n {
            d.update(OPEN, OPEN, t);
            t += 100;
        }
        t
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut h = RollingHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            h.push(v);
        }
        assert_eq!(h.len(), 3);
        assert!((h.mean().unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_history_has_no_mean() {
        let h = RollingHistory::new(5);
        assert!(h.is_empty());
        assert_eq!(h.mean(), None);
    }

    #[test]
    fn test_constant_ear_never_blinks() {
        let mut d = detector();
        for i in 0..200u64 {
            assert_eq!(d.update(0.27, 0.27, i * 100), BlinkEvent::Open);
        }
        assert_eq!(d.blink_count(), 0);
        assert_eq!(d.last_blink_ms(), None);
    }

    #[test]
    fn test_blink_is_edge_triggered() {
        let mut d = detector();
        let t = feed_open(&mut d, 20, 0);

        assert_eq!(d.update(CLOSED, CLOSED, t), BlinkEvent::Onset);
        assert_eq!(d.update(CLOSED, CLOSED, t + 100), BlinkEvent::StillClosed);
        assert_eq!(d.update(CLOSED, CLOSED, t + 200), BlinkEvent::StillClosed);
        assert_eq!(d.update(OPEN, OPEN, t + 300), BlinkEvent::Open);

        assert_eq!(d.blink_count(), 1);
        assert_eq!(d.last_blink_ms(), Some(t));
        assert!(!d.is_blinking());
    }

    #[test]
    fn test_reopen_rearms_detector() {
        let mut d = detector();
        let mut t = feed_open(&mut d, 20, 0);
        for _ in 0..3 {
            d.update(CLOSED, CLOSED, t);
            t = feed_open(&mut d, 5, t + 100);
        }
        assert_eq!(d.blink_count(), 3);
    }

    #[test]
    fn test_average_of_both_eyes() {
        let mut d = detector();
        let t = feed_open(&mut d, 20, 0);
        // One eye closed, one open: mean 0.2 is below 0.88 * baseline (~0.26)
        assert_eq!(d.update(0.10, 0.30, t), BlinkEvent::Onset);
    }

    #[test]
    fn test_small_dip_is_not_a_blink() {
        let mut d = detector();
        let t = feed_open(&mut d, 20, 0);
        // 5% below baseline stays within the 12% tolerance
        assert_eq!(d.update(0.285, 0.285, t), BlinkEvent::Open);
        assert_eq!(d.blink_count(), 0);
    }

    #[test]
    fn test_baseline_follows_drift() {
        // After a long run at a lower EAR the old open level is forgotten,
        // so the new level is not treated as closed.
        let mut d = detector();
        feed_open(&mut d, 50, 0);
        for i in 0..60u64 {
            d.update(0.22, 0.22, 5000 + i * 100);
        }
        assert_eq!(d.blink_count(), 1);
        assert!((d.rolling_average().unwrap() - 0.22).abs() < 1e-5);
        assert_eq!(d.update(0.22, 0.22, 20_000), BlinkEvent::Open);
    }

    #[test]
    fn test_since_last_blink_saturates() {
        let mut d = detector();
        let t = feed_open(&mut d, 10, 0);
        d.update(CLOSED, CLOSED, t);
        assert_eq!(d.since_last_blink(t + 250), Some(250));
        assert_eq!(d.since_last_blink(t - 100), Some(0));
    }

    #[test]
    fn test_excluding_current_sample_detects_first_drop() {
        // With a one-sample window the inclusive baseline equals the sample
        // itself, so nothing ever reads as closed. The exclusive baseline
        // compares against the previous frame instead.
        let inclusive = LivenessConfig { rolling_average_count: 1, ..Default::default() };
        let mut d = BlinkDetector::new(&inclusive);
        d.update(OPEN, OPEN, 0);
        assert_eq!(d.update(CLOSED, CLOSED, 100), BlinkEvent::Open);

        let exclusive = LivenessConfig {
            rolling_average_count: 1,
            baseline_excludes_current: true,
            ..Default::default()
        };
        let mut d = BlinkDetector::new(&exclusive);
        d.update(OPEN, OPEN, 0);
        assert_eq!(d.update(CLOSED, CLOSED, 100), BlinkEvent::Onset);
        assert_eq!(d.history().len(), 1);
    }

    #[test]
    fn test_first_sample_never_blinks() {
        for exclude in [false, true] {
            let config = LivenessConfig { baseline_excludes_current: exclude, ..Default::default() };
            let mut d = BlinkDetector::new(&config);
            assert_eq!(d.update(CLOSED, CLOSED, 0), BlinkEvent::Open);
        }
    }

    proptest! {
        #[test]
        fn test_history_never_exceeds_window(
            capacity in 1usize..64,
            samples in proptest::collection::vec(0.0f32..0.5, 0..200),
        ) {
            let config = LivenessConfig { rolling_average_count: capacity, ..Default::default() };
            let mut d = BlinkDetector::new(&config);
            for (i, s) in samples.iter().enumerate() {
                d.update(*s, *s, i as u64 * 100);
                prop_assert!(d.history().len() <= capacity);
            }
            prop_assert_eq!(d.history().len(), samples.len().min(capacity));
        }
    }
}
