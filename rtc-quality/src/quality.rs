//! Connection quality levels and the decision procedure that produces them.

use crate::smoother::SlidingStatSmoother;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum weighted packets per second for the lost packets ratio to be
/// considered reliable.
pub const MIN_PACKETS_PER_SECOND: f64 = 10.0;

/// Lost packets ratio above which the quality is [`ConnectionQuality::VeryBad`].
pub const VERY_BAD_PACKETS_LOST_RATIO: f64 = 0.3;
/// Lost packets ratio above which the quality is [`ConnectionQuality::Bad`].
pub const BAD_PACKETS_LOST_RATIO: f64 = 0.2;
/// Lost packets ratio above which the quality is [`ConnectionQuality::Medium`].
pub const MEDIUM_PACKETS_LOST_RATIO: f64 = 0.1;

/// Perceived quality of the media sent or received through a connection.
///
/// Variants are ordered by severity, so `Good < Medium < ... < NoTransmittedData`.
#[derive(
    Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionQuality {
    /// Not enough data has been gathered yet, the analysis is disabled or
    /// the connection is not active.
    #[default]
    Unknown,
    Good,
    Medium,
    Bad,
    VeryBad,
    /// No packets were transmitted in the recent intervals.
    NoTransmittedData,
}

const CONNECTION_QUALITY_UNKNOWN_STR: &str = "unknown";
const CONNECTION_QUALITY_GOOD_STR: &str = "good";
const CONNECTION_QUALITY_MEDIUM_STR: &str = "medium";
const CONNECTION_QUALITY_BAD_STR: &str = "bad";
const CONNECTION_QUALITY_VERY_BAD_STR: &str = "very-bad";
const CONNECTION_QUALITY_NO_TRANSMITTED_DATA_STR: &str = "no-transmitted-data";

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionQuality::Unknown => CONNECTION_QUALITY_UNKNOWN_STR,
            ConnectionQuality::Good => CONNECTION_QUALITY_GOOD_STR,
            ConnectionQuality::Medium => CONNECTION_QUALITY_MEDIUM_STR,
            ConnectionQuality::Bad => CONNECTION_QUALITY_BAD_STR,
            ConnectionQuality::VeryBad => CONNECTION_QUALITY_VERY_BAD_STR,
            ConnectionQuality::NoTransmittedData => CONNECTION_QUALITY_NO_TRANSMITTED_DATA_STR,
        };
        write!(f, "{s}")
    }
}

/// Classifies a media stream from its lost packets ratio and packets per
/// second windows.
///
/// Returns [`ConnectionQuality::Unknown`] until both windows are full. The
/// checks are evaluated in order and the first match wins:
///
/// | Condition (weighted averages)        | Quality               |
/// |--------------------------------------|-----------------------|
/// | lost ratio >= 1                      | `NoTransmittedData`   |
/// | packets per second < 10              | `VeryBad`             |
/// | lost ratio > 0.3                     | `VeryBad`             |
/// | lost ratio > 0.2                     | `Bad`                 |
/// | lost ratio > 0.1                     | `Medium`              |
/// | otherwise                            | `Good`                |
///
/// A NaN average fails every comparison, so it falls through to the next
/// check.
pub fn classify(
    packets_lost_ratio: &SlidingStatSmoother,
    packets_per_second: &SlidingStatSmoother,
) -> ConnectionQuality {
    if !packets_lost_ratio.has_enough_data() || !packets_per_second.has_enough_data() {
        return ConnectionQuality::Unknown;
    }

    let packets_lost_ratio_weighted_average = packets_lost_ratio.weighted_average();
    if packets_lost_ratio_weighted_average >= 1.0 {
        return ConnectionQuality::NoTransmittedData;
    }

    // Too few packets to trust the ratio of lost packets.
    if packets_per_second.weighted_average() < MIN_PACKETS_PER_SECOND {
        return ConnectionQuality::VeryBad;
    }

    if packets_lost_ratio_weighted_average > VERY_BAD_PACKETS_LOST_RATIO {
        return ConnectionQuality::VeryBad;
    }

    if packets_lost_ratio_weighted_average > BAD_PACKETS_LOST_RATIO {
        return ConnectionQuality::Bad;
    }

    if packets_lost_ratio_weighted_average > MEDIUM_PACKETS_LOST_RATIO {
        return ConnectionQuality::Medium;
    }

    ConnectionQuality::Good
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoother::StatValueType;

    // Equal weights, so the weighted average of a constant window is exact.
    fn constant_window(value: f64) -> SlidingStatSmoother {
        let mut smoother = SlidingStatSmoother::new(2, StatValueType::Relative, 1.0).unwrap();
        smoother.add(value);
        smoother.add(value);
        smoother
    }

    #[test]
    fn test_classify_boundaries() {
        let tests = vec![
            (1.0, 50.0, ConnectionQuality::NoTransmittedData),
            (1.5, 50.0, ConnectionQuality::NoTransmittedData),
            (1.0, 0.0, ConnectionQuality::NoTransmittedData),
            (0.0, 9.99, ConnectionQuality::VeryBad),
            (0.0, 10.0, ConnectionQuality::Good),
            (0.31, 50.0, ConnectionQuality::VeryBad),
            (0.3, 50.0, ConnectionQuality::Bad),
            (0.21, 50.0, ConnectionQuality::Bad),
            (0.2, 50.0, ConnectionQuality::Medium),
            (0.11, 50.0, ConnectionQuality::Medium),
            (0.1, 50.0, ConnectionQuality::Good),
            (0.05, 50.0, ConnectionQuality::Good),
            (0.0, 50.0, ConnectionQuality::Good),
        ];

        for (packets_lost_ratio, packets_per_second, expected) in tests {
            assert_eq!(
                classify(
                    &constant_window(packets_lost_ratio),
                    &constant_window(packets_per_second)
                ),
                expected,
                "lost ratio: {packets_lost_ratio}, packets per second: {packets_per_second}"
            );
        }
    }

    #[test]
    fn test_classify_unknown_until_both_windows_are_full() {
        let mut packets_lost_ratio =
            SlidingStatSmoother::new(3, StatValueType::Relative, 3.0).unwrap();
        let mut packets_per_second =
            SlidingStatSmoother::new(3, StatValueType::Relative, 3.0).unwrap();

        for _ in 0..3 {
            assert_eq!(
                classify(&packets_lost_ratio, &packets_per_second),
                ConnectionQuality::Unknown
            );
            packets_lost_ratio.add(0.0);
        }
        assert_eq!(
            classify(&packets_lost_ratio, &packets_per_second),
            ConnectionQuality::Unknown
        );

        for _ in 0..3 {
            packets_per_second.add(50.0);
        }
        assert_eq!(
            classify(&packets_lost_ratio, &packets_per_second),
            ConnectionQuality::Good
        );
    }

    #[test]
    fn test_classify_with_nan_averages() {
        // NaN packets per second skips the throughput check.
        assert_eq!(
            classify(&constant_window(0.25), &constant_window(f64::NAN)),
            ConnectionQuality::Bad
        );
        // NaN lost ratio fails every ratio check.
        assert_eq!(
            classify(&constant_window(f64::NAN), &constant_window(50.0)),
            ConnectionQuality::Good
        );
        assert_eq!(
            classify(&constant_window(0.0), &constant_window(f64::INFINITY)),
            ConnectionQuality::Good
        );
    }

    #[test]
    fn test_recent_samples_dominate() {
        let mut packets_lost_ratio =
            SlidingStatSmoother::new(5, StatValueType::Relative, 3.0).unwrap();
        let mut packets_per_second =
            SlidingStatSmoother::new(5, StatValueType::Relative, 3.0).unwrap();
        for value in [0.0, 0.0, 0.0, 0.5, 0.5] {
            packets_lost_ratio.add(value);
            packets_per_second.add(50.0);
        }

        // (0.5 * 2.5 + 0.5 * 3) / 10 = 0.275, an unweighted mean would be 0.2
        assert_eq!(
            classify(&packets_lost_ratio, &packets_per_second),
            ConnectionQuality::Bad
        );
        assert_eq!(packets_lost_ratio.average(), 0.2);
    }

    #[test]
    fn test_connection_quality_ordering_and_string() {
        assert!(ConnectionQuality::Unknown < ConnectionQuality::Good);
        assert!(ConnectionQuality::Good < ConnectionQuality::Medium);
        assert!(ConnectionQuality::Medium < ConnectionQuality::Bad);
        assert!(ConnectionQuality::Bad < ConnectionQuality::VeryBad);
        assert!(ConnectionQuality::VeryBad < ConnectionQuality::NoTransmittedData);

        assert_eq!(ConnectionQuality::VeryBad.to_string(), "very-bad");
        assert_eq!(
            ConnectionQuality::NoTransmittedData.to_string(),
            "no-transmitted-data"
        );
    }
}
