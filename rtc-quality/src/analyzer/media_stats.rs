use crate::media_kind::MediaKind;
use crate::quality::{ConnectionQuality, classify};
use crate::smoother::{SlidingStatSmoother, StatValueType};
use log::{trace, warn};
use serde::Serialize;
use shared::error::Result;

/// Capacity of the timestamps window; only the latest delta is used.
pub const TIMESTAMPS_WINDOW: usize = 2;

/// Lost packets ratio fed for an interval in which no packet was
/// transmitted. Greater than 1 so that the quality quickly becomes
/// [`ConnectionQuality::NoTransmittedData`].
pub const NO_TRANSMITTED_DATA_RATIO: f64 = 1.5;

/// Counters of one media kind read from a stats report.
///
/// A missing counter is not fed into its window for that interval.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StreamCounters {
    pub packets: Option<u64>,
    pub packets_lost: Option<u64>,
    /// Milliseconds, paired with `packets`.
    pub timestamp: Option<f64>,
    /// Seconds, only known for sender side stats.
    pub round_trip_time: Option<f64>,
}

/// Sliding windows of a single media kind.
#[derive(Debug, Clone)]
pub struct MediaStats {
    packets: SlidingStatSmoother,
    packets_lost: SlidingStatSmoother,
    packets_lost_ratio: SlidingStatSmoother,
    packets_per_second: SlidingStatSmoother,
    timestamps: SlidingStatSmoother,
}

impl MediaStats {
    pub fn new(window: usize, last_value_weight: f64) -> Result<Self> {
        Ok(Self {
            packets: SlidingStatSmoother::new(
                window,
                StatValueType::Cumulative,
                last_value_weight,
            )?,
            packets_lost: SlidingStatSmoother::new(
                window,
                StatValueType::Cumulative,
                last_value_weight,
            )?,
            packets_lost_ratio: SlidingStatSmoother::new(
                window,
                StatValueType::Relative,
                last_value_weight,
            )?,
            packets_per_second: SlidingStatSmoother::new(
                window,
                StatValueType::Relative,
                last_value_weight,
            )?,
            timestamps: SlidingStatSmoother::new(
                TIMESTAMPS_WINDOW,
                StatValueType::Cumulative,
                last_value_weight,
            )?,
        })
    }

    /// Empties every window.
    pub fn reset(&mut self) {
        self.packets.reset();
        self.packets_lost.reset();
        self.packets_lost_ratio.reset();
        self.packets_per_second.reset();
        self.timestamps.reset();
    }

    /// Feeds the counters of one polling interval and derives the lost
    /// packets ratio and the packets per second for it.
    ///
    /// Derived values are only fed once the cumulative windows hold a
    /// baseline sample, so the first counters after a reset never produce
    /// a ratio or a rate.
    pub(crate) fn ingest(&mut self, kind: MediaKind, counters: &StreamCounters) {
        let mut packets_lost = counters.packets_lost.map(|lost| lost as f64);
        if let Some(lost) = packets_lost
            && !self.packets_lost.is_empty()
        {
            let previous = self.packets_lost.last_raw_value();
            if lost < previous {
                warn!("{kind}: packets lost went down from {previous} to {lost}, keeping {previous}");
                packets_lost = Some(previous);
            }
        }

        if let Some(timestamp) = counters.timestamp
            && !self.timestamps.is_empty()
            && timestamp < self.timestamps.last_raw_value()
        {
            warn!(
                "{kind}: timestamp from the past, {timestamp} after {}",
                self.timestamps.last_raw_value()
            );
        }

        if let Some(packets) = counters.packets {
            self.packets.add(packets as f64);

            if self.packets.has_relative_value() && self.packets.last_relative_value() < 0.0 {
                match counters.round_trip_time {
                    Some(round_trip_time) => warn!(
                        "{kind}: negative packets in interval {}, round trip time {round_trip_time}s",
                        self.packets.last_relative_value()
                    ),
                    None => warn!(
                        "{kind}: negative packets in interval {}",
                        self.packets.last_relative_value()
                    ),
                }
            }
        }
        if let Some(lost) = packets_lost {
            self.packets_lost.add(lost);
        }

        if counters.packets.is_some()
            && packets_lost.is_some()
            && self.packets.has_relative_value()
            && self.packets_lost.has_relative_value()
        {
            let packets = self.packets.last_relative_value();
            let ratio = if packets > 0.0 {
                self.packets_lost.last_relative_value() / packets
            } else {
                NO_TRANSMITTED_DATA_RATIO
            };
            self.packets_lost_ratio.add(ratio);
        }

        if let Some(timestamp) = counters.timestamp {
            self.timestamps.add(timestamp);

            if counters.packets.is_some()
                && self.packets.has_relative_value()
                && self.timestamps.has_relative_value()
            {
                let elapsed_seconds = self.timestamps.last_relative_value() / 1000.0;
                self.packets_per_second
                    .add(self.packets.last_relative_value() / elapsed_seconds);
            }
        }

        trace!(
            "{kind}: packets {:?} lost {:?} timestamp {:?}, ratio {} packets/s {}",
            counters.packets,
            packets_lost,
            counters.timestamp,
            self.packets_lost_ratio.last_relative_value(),
            self.packets_per_second.last_relative_value(),
        );
    }

    /// Classifies the current windows.
    pub fn connection_quality(&self) -> ConnectionQuality {
        classify(&self.packets_lost_ratio, &self.packets_per_second)
    }

    pub fn packets(&self) -> &SlidingStatSmoother {
        &self.packets
    }

    pub fn packets_lost(&self) -> &SlidingStatSmoother {
        &self.packets_lost
    }

    pub fn packets_lost_ratio(&self) -> &SlidingStatSmoother {
        &self.packets_lost_ratio
    }

    pub fn packets_per_second(&self) -> &SlidingStatSmoother {
        &self.packets_per_second
    }

    pub fn timestamps(&self) -> &SlidingStatSmoother {
        &self.timestamps
    }

    /// Returns the current values of every window, for charting.
    pub fn sample(&self) -> MediaStatsSample {
        MediaStatsSample {
            packets: SeriesSample::from(&self.packets),
            packets_lost: SeriesSample::from(&self.packets_lost),
            packets_lost_ratio: SeriesSample::from(&self.packets_lost_ratio),
            packets_per_second: SeriesSample::from(&self.packets_per_second),
            quality: self.connection_quality(),
        }
    }
}

/// Current values of one window. NaN values are serialized as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSample {
    pub last_raw_value: f64,
    pub last_relative_value: f64,
    pub weighted_average: f64,
}

impl From<&SlidingStatSmoother> for SeriesSample {
    fn from(smoother: &SlidingStatSmoother) -> Self {
        Self {
            last_raw_value: smoother.last_raw_value(),
            last_relative_value: smoother.last_relative_value(),
            weighted_average: smoother.weighted_average(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatsSample {
    pub packets: SeriesSample,
    pub packets_lost: SeriesSample,
    pub packets_lost_ratio: SeriesSample,
    pub packets_per_second: SeriesSample,
    pub quality: ConnectionQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(packets: u64, packets_lost: u64, timestamp: f64) -> StreamCounters {
        StreamCounters {
            packets: Some(packets),
            packets_lost: Some(packets_lost),
            timestamp: Some(timestamp),
            round_trip_time: None,
        }
    }

    #[test]
    fn test_first_counters_are_only_a_baseline() {
        let mut stats = MediaStats::new(5, 3.0).unwrap();
        stats.ingest(MediaKind::Audio, &counters(100, 0, 1000.0));

        assert_eq!(stats.packets().len(), 1);
        assert_eq!(stats.packets_lost().len(), 1);
        assert_eq!(stats.timestamps().len(), 1);
        assert!(stats.packets_lost_ratio().is_empty());
        assert!(stats.packets_per_second().is_empty());
    }

    #[test]
    fn test_ratio_and_packets_per_second() {
        let mut stats = MediaStats::new(5, 3.0).unwrap();
        stats.ingest(MediaKind::Video, &counters(100, 10, 1000.0));
        stats.ingest(MediaKind::Video, &counters(200, 30, 1500.0));

        assert_eq!(stats.packets_lost_ratio().last_relative_value(), 0.2);
        assert_eq!(stats.packets_per_second().last_relative_value(), 200.0);
    }

    #[test]
    fn test_no_transmitted_packets() {
        let mut stats = MediaStats::new(2, 3.0).unwrap();
        for timestamp in [0.0, 1000.0, 2000.0] {
            stats.ingest(MediaKind::Audio, &counters(50, 0, timestamp));
        }

        assert_eq!(
            stats.packets_lost_ratio().relative_values().collect::<Vec<_>>(),
            vec![NO_TRANSMITTED_DATA_RATIO, NO_TRANSMITTED_DATA_RATIO]
        );
        assert_eq!(
            stats.connection_quality(),
            ConnectionQuality::NoTransmittedData
        );
    }

    #[test]
    fn test_packets_lost_regression_is_clamped() {
        let mut stats = MediaStats::new(5, 3.0).unwrap();
        stats.ingest(MediaKind::Audio, &counters(100, 5, 1000.0));
        stats.ingest(MediaKind::Audio, &counters(150, 3, 2000.0));

        assert_eq!(
            stats.packets_lost().raw_values().collect::<Vec<_>>(),
            vec![5.0, 5.0]
        );
        assert_eq!(stats.packets_lost_ratio().last_relative_value(), 0.0);
    }

    #[test]
    fn test_missing_counters_are_not_fed() {
        let mut stats = MediaStats::new(5, 3.0).unwrap();
        stats.ingest(MediaKind::Audio, &counters(100, 0, 1000.0));
        stats.ingest(
            MediaKind::Audio,
            &StreamCounters {
                packets: Some(120),
                timestamp: Some(2000.0),
                ..Default::default()
            },
        );

        assert_eq!(stats.packets().len(), 2);
        assert_eq!(stats.packets_lost().len(), 1);
        assert!(stats.packets_lost_ratio().is_empty());
        assert_eq!(stats.packets_per_second().last_relative_value(), 20.0);
    }

    #[test]
    fn test_sample_and_reset() {
        let mut stats = MediaStats::new(2, 3.0).unwrap();
        for (packets, timestamp) in [(0, 0.0), (100, 1000.0), (200, 2000.0)] {
            stats.ingest(MediaKind::Audio, &counters(packets, 0, timestamp));
        }

        let sample = stats.sample();
        assert_eq!(sample.packets.last_raw_value, 200.0);
        assert_eq!(sample.packets.last_relative_value, 100.0);
        assert_eq!(sample.packets_per_second.weighted_average, 100.0);
        assert_eq!(sample.packets_lost_ratio.weighted_average, 0.0);
        assert_eq!(sample.quality, ConnectionQuality::Good);

        stats.reset();
        assert!(stats.packets().is_empty());
        assert!(stats.timestamps().is_empty());
        assert!(stats.sample().packets.weighted_average.is_nan());
        assert_eq!(stats.connection_quality(), ConnectionQuality::Unknown);
    }
}
