//! Sliding window over periodically sampled statistic values.
//!
//! [`SlidingStatSmoother`] keeps the last `capacity` samples of a value
//! reported by `getStats()` and turns them into per-interval (relative)
//! values, which can then be averaged giving more weight to the most recent
//! samples.

use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Default weight of the newest sample when calculating the weighted average.
pub const DEFAULT_LAST_VALUE_WEIGHT: f64 = 3.0;

/// How the values added to a [`SlidingStatSmoother`] relate to each other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatValueType {
    /// Running total since the stream started (for example `packetsReceived`).
    ///
    /// The relative value of a sample is the difference with the previous
    /// raw value.
    #[default]
    Cumulative,

    /// Value that already describes a single interval.
    ///
    /// The relative value of a sample is the raw value itself.
    Relative,
}

/// Fixed capacity rolling window of raw and relative statistic values.
///
/// When the window is full the oldest sample is evicted before a new one is
/// added. Raw and relative values are always evicted together, so both
/// sequences have the same length.
///
/// In [`StatValueType::Cumulative`] mode the first sample after creation or
/// [`reset`](SlidingStatSmoother::reset) has no previous value to be compared
/// with, so its relative value is always `0`. That value does not describe a
/// real interval; [`has_relative_value`](SlidingStatSmoother::has_relative_value)
/// tells whether the last relative value is meaningful.
///
/// # Example
///
/// ```
/// use rtc_quality::smoother::{SlidingStatSmoother, StatValueType};
///
/// let mut packets = SlidingStatSmoother::new(4, StatValueType::Cumulative, 3.0)?;
/// for value in [10.0, 15.0, 15.0, 20.0] {
///     packets.add(value);
/// }
///
/// assert!(packets.has_enough_data());
/// assert_eq!(packets.relative_values().collect::<Vec<_>>(), vec![0.0, 5.0, 0.0, 5.0]);
/// # Ok::<(), rtc_quality::shared::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SlidingStatSmoother {
    capacity: usize,
    typ: StatValueType,
    last_value_weight: f64,
    extra_weight_per_element: f64,

    raw_values: VecDeque<f64>,
    relative_values: VecDeque<f64>,
}

impl SlidingStatSmoother {
    /// Creates an empty window.
    ///
    /// `last_value_weight` is the weight of the newest sample in a full
    /// window; weights grow linearly from 1 for the oldest sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrWindowCapacityTooSmall`] if `capacity` is lower
    /// than 2, and [`Error::ErrInvalidLastValueWeight`] if the weight is not a
    /// finite positive number.
    pub fn new(capacity: usize, typ: StatValueType, last_value_weight: f64) -> Result<Self> {
        if capacity < 2 {
            return Err(Error::ErrWindowCapacityTooSmall(capacity));
        }
        if !last_value_weight.is_finite() || last_value_weight <= 0.0 {
            return Err(Error::ErrInvalidLastValueWeight);
        }

        Ok(Self {
            capacity,
            typ,
            last_value_weight,
            extra_weight_per_element: (last_value_weight - 1.0) / (capacity - 1) as f64,

            raw_values: VecDeque::with_capacity(capacity),
            relative_values: VecDeque::with_capacity(capacity),
        })
    }

    /// Removes every sample; the next one starts a fresh window.
    pub fn reset(&mut self) {
        self.raw_values.clear();
        self.relative_values.clear();
    }

    /// Adds a new raw sample, evicting the oldest one if the window is full.
    pub fn add(&mut self, value: f64) {
        if self.raw_values.len() == self.capacity {
            self.raw_values.pop_front();
            self.relative_values.pop_front();
        }

        let relative_value = match self.typ {
            StatValueType::Cumulative => {
                value - self.raw_values.back().copied().unwrap_or(value)
            }
            StatValueType::Relative => value,
        };

        self.raw_values.push_back(value);
        self.relative_values.push_back(relative_value);
    }

    /// Returns the newest raw sample, or NaN if the window is empty.
    pub fn last_raw_value(&self) -> f64 {
        self.raw_values.back().copied().unwrap_or(f64::NAN)
    }

    /// Returns the newest relative value, or NaN if the window is empty.
    pub fn last_relative_value(&self) -> f64 {
        self.relative_values.back().copied().unwrap_or(f64::NAN)
    }

    /// Returns whether the newest relative value describes a real interval.
    ///
    /// Always true for a non empty [`StatValueType::Relative`] window; a
    /// cumulative window needs a previous raw value as baseline.
    pub fn has_relative_value(&self) -> bool {
        match self.typ {
            StatValueType::Cumulative => self.raw_values.len() >= 2,
            StatValueType::Relative => !self.raw_values.is_empty(),
        }
    }

    /// Returns true once the window is completely full.
    pub fn has_enough_data(&self) -> bool {
        self.raw_values.len() == self.capacity
    }

    /// Returns the mean of the relative values, weighting each one from 1
    /// (oldest) up to the last value weight (newest, for a full window).
    ///
    /// An empty window yields NaN; check [`has_enough_data`](Self::has_enough_data)
    /// first.
    pub fn weighted_average(&self) -> f64 {
        let mut weighted_values = 0.0;
        let mut weights_sum = 0.0;

        for (i, value) in self.relative_values.iter().enumerate() {
            let weight = 1.0 + (i as f64 * self.extra_weight_per_element);

            weighted_values += value * weight;
            weights_sum += weight;
        }

        weighted_values / weights_sum
    }

    /// Returns the unweighted mean of the relative values, or NaN if empty.
    pub fn average(&self) -> f64 {
        let sum: f64 = self.relative_values.iter().sum();

        sum / self.relative_values.len() as f64
    }

    /// Returns the median of the relative values, or NaN if empty.
    ///
    /// With an even number of values the mean of the two middle ones is
    /// returned. NaN values are sorted after every number.
    pub fn median(&self) -> f64 {
        let mut sorted: Vec<f64> = self.relative_values.iter().copied().collect();
        if sorted.is_empty() {
            return f64::NAN;
        }

        sorted.sort_by(|a, b| {
            a.partial_cmp(b)
                .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
        });

        let middle = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[middle - 1] + sorted[middle]) / 2.0
        } else {
            sorted[middle]
        }
    }

    /// Iterates over the raw samples, oldest first.
    pub fn raw_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.raw_values.iter().copied()
    }

    /// Iterates over the relative values, oldest first.
    pub fn relative_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.relative_values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.raw_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn value_type(&self) -> StatValueType {
        self.typ
    }

    pub fn last_value_weight(&self) -> f64 {
        self.last_value_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative(values: &[f64]) -> SlidingStatSmoother {
        let mut smoother =
            SlidingStatSmoother::new(values.len(), StatValueType::Relative, 3.0).unwrap();
        for value in values {
            smoother.add(*value);
        }
        smoother
    }

    #[test]
    fn test_new_rejects_invalid_configuration() {
        assert_eq!(
            SlidingStatSmoother::new(1, StatValueType::Cumulative, 3.0).unwrap_err(),
            Error::ErrWindowCapacityTooSmall(1)
        );
        assert_eq!(
            SlidingStatSmoother::new(0, StatValueType::Relative, 3.0).unwrap_err(),
            Error::ErrWindowCapacityTooSmall(0)
        );

        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                SlidingStatSmoother::new(5, StatValueType::Relative, weight).unwrap_err(),
                Error::ErrInvalidLastValueWeight,
                "weight: {weight}"
            );
        }

        assert!(SlidingStatSmoother::new(2, StatValueType::Cumulative, 1.0).is_ok());
    }

    #[test]
    fn test_empty_window() {
        let smoother = SlidingStatSmoother::new(3, StatValueType::Cumulative, 3.0).unwrap();

        assert!(smoother.is_empty());
        assert!(!smoother.has_enough_data());
        assert!(!smoother.has_relative_value());
        assert!(smoother.last_raw_value().is_nan());
        assert!(smoother.last_relative_value().is_nan());
        assert!(smoother.weighted_average().is_nan());
        assert!(smoother.average().is_nan());
        assert!(smoother.median().is_nan());
    }

    #[test]
    fn test_fifo_eviction_keeps_sequences_aligned() {
        for capacity in 2..8 {
            let mut smoother =
                SlidingStatSmoother::new(capacity, StatValueType::Cumulative, 3.0).unwrap();

            for i in 0..capacity * 3 {
                smoother.add(i as f64 * 2.0);

                assert_eq!(
                    smoother.raw_values().count(),
                    smoother.relative_values().count()
                );
                assert!(smoother.len() <= capacity);
            }

            assert_eq!(smoother.len(), capacity);
            assert!(smoother.has_enough_data());
            assert_eq!(smoother.last_raw_value(), (capacity * 3 - 1) as f64 * 2.0);
        }
    }

    #[test]
    fn test_has_enough_data_only_when_full() {
        let mut smoother = SlidingStatSmoother::new(4, StatValueType::Relative, 3.0).unwrap();

        for _ in 0..3 {
            smoother.add(1.0);
            assert!(!smoother.has_enough_data());
        }

        smoother.add(1.0);
        assert!(smoother.has_enough_data());
    }

    #[test]
    fn test_cumulative_first_relative_value_is_zero() {
        for first in [0.0, 42.0, -7.5, 1e9] {
            let mut smoother =
                SlidingStatSmoother::new(3, StatValueType::Cumulative, 3.0).unwrap();
            smoother.add(first);

            assert_eq!(smoother.last_raw_value(), first);
            assert_eq!(smoother.last_relative_value(), 0.0);
            assert!(!smoother.has_relative_value());
        }
    }

    #[test]
    fn test_cumulative_relative_values() {
        let mut smoother = SlidingStatSmoother::new(4, StatValueType::Cumulative, 3.0).unwrap();
        for value in [10.0, 15.0, 15.0, 20.0] {
            smoother.add(value);
        }

        assert_eq!(
            smoother.raw_values().collect::<Vec<_>>(),
            vec![10.0, 15.0, 15.0, 20.0]
        );
        assert_eq!(
            smoother.relative_values().collect::<Vec<_>>(),
            vec![0.0, 5.0, 0.0, 5.0]
        );
        assert!(smoother.has_relative_value());
    }

    #[test]
    fn test_cumulative_relative_value_after_eviction() {
        let mut smoother = SlidingStatSmoother::new(2, StatValueType::Cumulative, 3.0).unwrap();
        for value in [1.0, 3.0, 6.0] {
            smoother.add(value);
        }

        assert_eq!(smoother.raw_values().collect::<Vec<_>>(), vec![3.0, 6.0]);
        assert_eq!(smoother.relative_values().collect::<Vec<_>>(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_relative_values_are_raw_values() {
        let smoother = relative(&[0.5, 1.5, 0.25]);

        assert_eq!(
            smoother.relative_values().collect::<Vec<_>>(),
            smoother.raw_values().collect::<Vec<_>>()
        );
        assert!(smoother.has_relative_value());
    }

    #[test]
    fn test_weighted_average() {
        let smoother = relative(&[2.0, 4.0, 6.0]);

        // weights 1, 2, 3
        let expected = (2.0 + 4.0 * 2.0 + 6.0 * 3.0) / 6.0;
        assert!((smoother.weighted_average() - expected).abs() < 1e-12);
        assert!((smoother.weighted_average() - 4.666_666_666_666_667).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_with_partial_window() {
        let mut smoother = SlidingStatSmoother::new(5, StatValueType::Relative, 3.0).unwrap();
        smoother.add(1.0);
        smoother.add(3.0);

        // weights 1 and 1.5 while the window is not full yet
        let expected = (1.0 + 3.0 * 1.5) / 2.5;
        assert!((smoother.weighted_average() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_average_propagates_nan() {
        let smoother = relative(&[1.0, f64::NAN, 1.0]);
        assert!(smoother.weighted_average().is_nan());
    }

    #[test]
    fn test_average_and_median() {
        let smoother = relative(&[3.0, 1.0, 2.0]);
        assert_eq!(smoother.average(), 2.0);
        assert_eq!(smoother.median(), 2.0);

        let smoother = relative(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(smoother.average(), 2.5);
        assert_eq!(smoother.median(), 2.5);

        let smoother = relative(&[f64::NAN, 1.0, 2.0]);
        assert_eq!(smoother.median(), 2.0);
    }

    #[test]
    fn test_reset_starts_fresh_window() {
        let mut smoother = SlidingStatSmoother::new(3, StatValueType::Cumulative, 3.0).unwrap();
        for value in [10.0, 20.0, 30.0] {
            smoother.add(value);
        }
        assert!(smoother.has_enough_data());

        smoother.reset();
        assert!(smoother.is_empty());
        assert!(!smoother.has_enough_data());

        smoother.add(100.0);
        assert_eq!(smoother.last_relative_value(), 0.0);
        assert_eq!(smoother.len(), 1);
    }
}
