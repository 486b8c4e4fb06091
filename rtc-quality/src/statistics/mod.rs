//! Statistics module for connection quality analysis.
//!
//! This module provides the subset of the W3C WebRTC Statistics API that
//! the analyzer consumes:
//! - `rtp_stream` - RTP stream statistics dictionaries
//! - `report` - Statistics report, the result of a `getStats()` call

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod report;
pub mod rtp_stream;

/// The type of statistics object.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RTCStatsType {
    /// Any statistics object not consumed by the analyzer.
    #[default]
    Unspecified,
    InboundRTP,
    OutboundRTP,
    RemoteInboundRTP,
}

impl fmt::Display for RTCStatsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCStatsType::Unspecified => "unspecified",
            RTCStatsType::InboundRTP => "inbound-rtp",
            RTCStatsType::OutboundRTP => "outbound-rtp",
            RTCStatsType::RemoteInboundRTP => "remote-inbound-rtp",
        };
        write!(f, "{s}")
    }
}

/// The unique identifier for a statistics object.
pub type RTCStatsId = String;

/// Base statistics object containing common fields.
///
/// The `type` member of the W3C dictionary is carried by
/// [`RTCStatsReportEntry`](report::RTCStatsReportEntry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTCStats {
    /// Time the stats were sampled, in milliseconds (`DOMHighResTimeStamp`).
    pub timestamp: f64,
    pub id: RTCStatsId,
}

impl RTCStats {
    pub fn new(id: impl Into<RTCStatsId>, timestamp: f64) -> Self {
        Self {
            timestamp,
            id: id.into(),
        }
    }
}
