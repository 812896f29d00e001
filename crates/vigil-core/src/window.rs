//! Fixed-capacity rolling window with O(1) mean/variance maintenance.
//!
//! Samples live in a ring buffer (arena + head index), so admitting a new
//! sample and evicting the oldest one never shifts memory. Running sums are
//! kept relative to a reference value (`shift`) close to the data, which keeps
//! `E[x²] - E[x]²` well conditioned when the signal sits far from zero.
//!
//! The sums are rebuilt from the buffer, re-anchored on the buffer mean, in
//! two cases: once per `capacity` evictions, and as soon as the largest
//! `sum_sq` seen since the last rebuild exceeds the current spread by more
//! than [`RESYNC_RATIO`]. The second case is what happens when a dominant
//! sample leaves the window; subtracting its contribution would otherwise
//! leave rounding error on the scale of that sample. A run of identical
//! values covering the whole window is reported exactly (mean = value,
//! variance = 0) without consulting the sums at all.

use crate::error::{Result, VigilError, ensure_all_finite, ensure_finite};

/// Largest tolerated ratio between the peak of `sum_sq` since the last
/// rebuild and the window's current spread before the sums are rebuilt.
pub const RESYNC_RATIO: f64 = 1e3;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    buffer: Box<[f64]>,
    head: usize,
    len: usize,

    // Accumulators over (x - shift)
    shift: f64,
    sum: f64,
    sum_sq: f64,
    peak_sum_sq: f64,

    // Trailing samples equal to the newest one
    run: usize,
    evictions_since_sync: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VigilError::config("window_size", "must be at least 1"));
        }
        Ok(Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            shift: 0.0,
            sum: 0.0,
            sum_sq: 0.0,
            peak_sum_sq: 0.0,
            run: 0,
            evictions_since_sync: 0,
        })
    }

    /// Append `value`, evicting and returning the oldest sample if the window
    /// was already full. Non-finite values are rejected and leave the window
    /// untouched.
    pub fn push(&mut self, value: f64) -> Result<Option<f64>> {
        let value = ensure_finite(value)?;
        let capacity = self.capacity();

        if self.len == 0 {
            self.shift = value;
            self.sum = 0.0;
            self.sum_sq = 0.0;
            self.peak_sum_sq = 0.0;
        }

        self.run = if self.newest() == Some(value) {
            (self.run + 1).min(capacity)
        } else {
            1
        };

        let evicted = if self.len == capacity {
            let old = self.buffer[self.head];
            self.buffer[self.head] = value;
            self.head = (self.head + 1) % capacity;

            let d = old - self.shift;
            self.sum -= d;
            self.sum_sq -= d * d;
            Some(old)
        } else {
            let tail = (self.head + self.len) % capacity;
            self.buffer[tail] = value;
            self.len += 1;
            None
        };

        let d = value - self.shift;
        self.sum += d;
        self.sum_sq += d * d;
        self.peak_sum_sq = self.peak_sum_sq.max(self.sum_sq);

        if evicted.is_some() {
            self.evictions_since_sync += 1;
        }
        if self.evictions_since_sync >= capacity || self.lost_precision() {
            self.resync();
        }

        Ok(evicted)
    }

    /// Replace the contents with the most recent `capacity` values of
    /// `history` (all of it when shorter), preserving order. The whole slice
    /// is checked before anything is replaced.
    pub fn refill(&mut self, history: &[f64]) -> Result<()> {
        ensure_all_finite(history)?;
        self.clear();
        let start = history.len().saturating_sub(self.capacity());
        for &value in &history[start..] {
            self.push(value)?;
        }
        self.resync();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.shift = 0.0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
        self.peak_sum_sq = 0.0;
        self.run = 0;
        self.evictions_since_sync = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Samples oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |i| self.buffer[(self.head + i) % capacity])
    }

    /// Most recently admitted sample.
    pub fn newest(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.buffer[(self.head + self.len - 1) % self.capacity()])
    }

    /// The single value held when every buffered sample is identical.
    pub fn constant_value(&self) -> Option<f64> {
        self.newest().filter(|_| self.run == self.len)
    }

    /// Sum of the buffered samples.
    pub fn sum(&self) -> f64 {
        self.shift * self.len as f64 + self.sum
    }

    /// Sum of the squared buffered samples.
    pub fn sum_of_squares(&self) -> f64 {
        let n = self.len as f64;
        self.sum_sq + 2.0 * self.shift * self.sum + n * self.shift * self.shift
    }

    /// Arithmetic mean, 0 for an empty window.
    pub fn mean(&self) -> f64 {
        if let Some(value) = self.constant_value() {
            return value;
        }
        if self.len == 0 {
            return 0.0;
        }
        self.shift + self.sum / self.len as f64
    }

    /// Population variance, clamped at zero against cancellation.
    pub fn variance(&self) -> f64 {
        if self.len == 0 || self.constant_value().is_some() {
            return 0.0;
        }
        let n = self.len as f64;
        let m = self.sum / n;
        (self.sum_sq / n - m * m).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// `n · variance` as seen by the sums, compared against the largest
    /// `sum_sq` they have carried since the last rebuild.
    fn lost_precision(&self) -> bool {
        let spread = self.sum_sq - self.sum * self.sum / self.len as f64;
        self.peak_sum_sq > RESYNC_RATIO * spread
    }

    /// Rebuild the accumulators from the buffer, re-anchored on its mean.
    fn resync(&mut self) {
        self.evictions_since_sync = 0;
        let Some(anchor) = self.iter().next() else {
            self.peak_sum_sq = 0.0;
            return;
        };

        // Offsets from the oldest sample first, so identical samples give an
        // exact shift and zero sums.
        let n = self.len as f64;
        let shift = anchor + self.iter().map(|x| x - anchor).sum::<f64>() / n;
        let (sum, sum_sq) = self.iter().fold((0.0, 0.0), |(s, sq), x| {
            let d = x - shift;
            (s + d, sq + d * d)
        });

        self.shift = shift;
        self.sum = sum;
        self.sum_sq = sum_sq;
        self.peak_sum_sq = sum_sq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_stats(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn rel_err(a: f64, b: f64) -> f64 {
        (a - b).abs() / b.abs().max(f64::MIN_POSITIVE)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RollingWindow::new(0).unwrap_err();
        assert!(matches!(
            err,
            VigilError::Configuration {
                field: "window_size",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_window_stats() {
        let window = RollingWindow::new(4).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.variance(), 0.0);
        assert_eq!(window.std_dev(), 0.0);
        assert_eq!(window.newest(), None);
        assert_eq!(window.constant_value(), None);
    }

    #[test]
    fn test_push_evicts_oldest_first() {
        let mut window = RollingWindow::new(3).unwrap();
        assert_eq!(window.push(1.0).unwrap(), None);
        assert_eq!(window.push(2.0).unwrap(), None);
        assert_eq!(window.push(3.0).unwrap(), None);
        assert!(window.is_full());

        assert_eq!(window.push(4.0).unwrap(), Some(1.0));
        assert_eq!(window.push(5.0).unwrap(), Some(2.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(window.newest(), Some(5.0));
    }

    #[test]
    fn test_non_finite_push_rejected() {
        let mut window = RollingWindow::new(3).unwrap();
        window.push(1.0).unwrap();
        window.push(2.0).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                window.push(bad),
                Err(VigilError::InvalidSample { .. })
            ));
        }
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![1.0, 2.0]);
        assert_eq!(window.mean(), 1.5);
    }

    #[test]
    fn test_non_finite_refill_leaves_window() {
        let mut window = RollingWindow::new(3).unwrap();
        window.push(4.0).unwrap();
        assert!(window.refill(&[1.0, f64::NAN, 3.0]).is_err());
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![4.0]);
        assert_eq!(window.mean(), 4.0);
    }

    #[test]
    fn test_incremental_matches_direct() {
        let mut window = RollingWindow::new(7).unwrap();
        let mut all = Vec::new();

        for i in 0..200 {
            let x = 100.0 + (i as f64 * 0.37).sin() * 12.0 + (i % 5) as f64;
            window.push(x).unwrap();
            all.push(x);

            let start = all.len().saturating_sub(7);
            let (mean, var) = direct_stats(&all[start..]);
            assert!(close(window.mean(), mean), "mean drift at {}", i);
            assert!(close(window.variance(), var), "variance drift at {}", i);
            assert!(close(window.sum(), all[start..].iter().sum()));
        }
    }

    #[test]
    fn test_large_sample_leaving_keeps_precision() {
        let mut window = RollingWindow::new(4).unwrap();
        for x in [123456.789, 1.1, 2.3, 3.7, 4.9] {
            window.push(x).unwrap();
        }
        let buf: Vec<f64> = window.iter().collect();
        assert_eq!(buf, vec![1.1, 2.3, 3.7, 4.9]);

        let (mean, var) = direct_stats(&buf);
        assert!(rel_err(window.mean(), mean) <= 1e-9, "mean {}", window.mean());
        assert!(rel_err(window.variance(), var) <= 1e-9, "var {}", window.variance());
    }

    #[test]
    fn test_constant_tail_is_exact() {
        let mut window = RollingWindow::new(4).unwrap();
        for x in [1000.3, 7.7, 0.1, 0.1, 0.1, 0.1] {
            window.push(x).unwrap();
        }
        assert_eq!(window.constant_value(), Some(0.1));
        assert_eq!(window.mean(), 0.1);
        assert_eq!(window.variance(), 0.0);

        // Breaking the run falls back to the accumulators
        window.push(0.2).unwrap();
        assert_eq!(window.constant_value(), None);
        let (mean, var) = direct_stats(&[0.1, 0.1, 0.1, 0.2]);
        assert!(rel_err(window.mean(), mean) <= 1e-9);
        assert!(rel_err(window.variance(), var) <= 1e-9);
    }

    #[test]
    fn test_constant_tail_after_noise_each_phase() {
        let noise = [912.4, 3.3, 517.0, 88.8, 0.6, 271.9, 640.2, 45.5, 999.9];
        let level = 16.50980813469957;
        for capacity in 1..=6 {
            for prefix in 0..noise.len() {
                let mut window = RollingWindow::new(capacity).unwrap();
                for &x in &noise[..prefix] {
                    window.push(x).unwrap();
                }
                for _ in 0..capacity {
                    window.push(level).unwrap();
                }
                assert_eq!(window.mean(), level, "cap {} prefix {}", capacity, prefix);
                assert_eq!(window.variance(), 0.0, "cap {} prefix {}", capacity, prefix);
            }
        }
    }

    #[test]
    fn test_sum_of_squares() {
        let mut window = RollingWindow::new(3).unwrap();
        for x in [2.0, 3.0, 4.0, 5.0] {
            window.push(x).unwrap();
        }
        assert!(close(window.sum_of_squares(), 9.0 + 16.0 + 25.0));
    }

    #[test]
    fn test_constant_signal_has_zero_variance() {
        let mut window = RollingWindow::new(5).unwrap();
        for _ in 0..50 {
            window.push(1e6 + 0.1).unwrap();
        }
        assert_eq!(window.variance(), 0.0);
        assert_eq!(window.mean(), 1e6 + 0.1);
    }

    #[test]
    fn test_large_offset_small_spread() {
        let mut window = RollingWindow::new(4).unwrap();
        for x in [1e9 + 1.0, 1e9 + 2.0, 1e9 + 3.0, 1e9 + 4.0] {
            window.push(x).unwrap();
        }
        assert!((window.variance() - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_refill_keeps_tail() {
        let mut window = RollingWindow::new(3).unwrap();
        window.push(42.0).unwrap();
        window.refill(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert!(close(window.mean(), 4.0));

        window.refill(&[7.0]).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.mean(), 7.0);
    }

    #[test]
    fn test_capacity_one() {
        let mut window = RollingWindow::new(1).unwrap();
        assert_eq!(window.push(3.0).unwrap(), None);
        assert_eq!(window.push(8.0).unwrap(), Some(3.0));
        assert_eq!(window.mean(), 8.0);
        assert_eq!(window.variance(), 0.0);
    }
}
