//! RTP stream statistics.
//!
//! This module contains the statistics types for RTP streams consumed by the
//! analyzer:
//!
//! - [`RTCRtpStreamStats`] - Base statistics shared by all RTP streams
//! - [`RTCReceivedRtpStreamStats`] - Base for received streams
//! - [`RTCSentRtpStreamStats`] - Base for sent streams
//! - [`RTCInboundRtpStreamStats`] - Local inbound stream stats
//! - [`RTCRemoteInboundRtpStreamStats`] - Remote inbound stream stats
//! - [`RTCOutboundRtpStreamStats`] - Local outbound stream stats
//!
//! Counters are optional because user agents do not report every member of
//! the dictionaries (for example Chromium does not provide `packetsReceived`
//! in `remote-inbound-rtp`). A missing counter is never the same as zero.

use super::RTCStats;
use crate::media_kind::MediaKind;
use serde::{Deserialize, Serialize};

/// Synchronization source identifier of an RTP stream.
pub type SSRC = u32;

/// Base statistics for an RTP stream.
///
/// # W3C Reference
///
/// See [RTCRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#rtpstreamstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpStreamStats {
    /// Base statistics fields (timestamp, id).
    #[serde(flatten)]
    pub stats: RTCStats,

    /// The SSRC (Synchronization Source) identifier of this stream.
    #[serde(default)]
    pub ssrc: SSRC,

    /// The media kind (audio or video).
    pub kind: MediaKind,
}

/// Base statistics for a received RTP stream.
///
/// # W3C Reference
///
/// See [RTCReceivedRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#receivedrtpstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCReceivedRtpStreamStats {
    /// Base RTP stream statistics.
    #[serde(flatten)]
    pub rtp_stream_stats: RTCRtpStreamStats,

    /// Total number of RTP packets received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_received: Option<u64>,

    /// Total number of packets lost.
    ///
    /// This value can be negative if more packets are received
    /// than expected (e.g., due to duplicates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_lost: Option<i64>,

    /// Inter-arrival jitter in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
}

/// Base statistics for a sent RTP stream.
///
/// # W3C Reference
///
/// See [RTCSentRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#sentrtpstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCSentRtpStreamStats {
    /// Base RTP stream statistics.
    #[serde(flatten)]
    pub rtp_stream_stats: RTCRtpStreamStats,

    /// Total number of RTP packets sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_sent: Option<u64>,

    /// Total number of payload bytes sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_sent: Option<u64>,
}

/// Statistics for an inbound RTP stream, as seen by the local receiver.
///
/// # W3C Reference
///
/// See [RTCInboundRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#inboundrtpstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCInboundRtpStreamStats {
    /// Base received RTP stream statistics.
    #[serde(flatten)]
    pub received_rtp_stream_stats: RTCReceivedRtpStreamStats,

    /// Total number of payload bytes received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_received: Option<u64>,

    /// Number of NACK packets sent by this receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nack_count: Option<u32>,
}

/// Statistics for an outbound RTP stream, as seen by the local sender.
///
/// # W3C Reference
///
/// See [RTCOutboundRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#outboundrtpstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCOutboundRtpStreamStats {
    /// Base sent RTP stream statistics.
    #[serde(flatten)]
    pub sent_rtp_stream_stats: RTCSentRtpStreamStats,

    /// Number of NACK packets received by this sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nack_count: Option<u32>,
}

/// Statistics for a remote inbound RTP stream.
///
/// The remote endpoint's view of the stream sent by the local endpoint,
/// derived from RTCP Receiver Reports.
///
/// # W3C Reference
///
/// See [RTCRemoteInboundRtpStreamStats](https://www.w3.org/TR/webrtc-stats/#remoteinboundrtpstats-dict*)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRemoteInboundRtpStreamStats {
    /// Base received RTP stream statistics.
    #[serde(flatten)]
    pub received_rtp_stream_stats: RTCReceivedRtpStreamStats,

    /// The ID of the corresponding local outbound stats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,

    /// The most recent round trip time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_trip_time: Option<f64>,

    /// Fraction of packets lost (0.0 to 1.0) in the last RTCP report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction_lost: Option<f64>,
}

impl RTCRtpStreamStats {
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            stats: RTCStats::new(id, timestamp),
            ssrc: 0,
            kind,
        }
    }
}

impl RTCReceivedRtpStreamStats {
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            rtp_stream_stats: RTCRtpStreamStats::new(id, kind, timestamp),
            packets_received: None,
            packets_lost: None,
            jitter: None,
        }
    }

    /// Returns `packetsLost` unless it is missing or negative.
    ///
    /// A negative cumulative loss cannot be turned into a loss ratio, so it
    /// is handled as if the user agent had not reported it.
    pub(crate) fn non_negative_packets_lost(&self) -> Option<u64> {
        self.packets_lost.and_then(|lost| u64::try_from(lost).ok())
    }
}

impl RTCSentRtpStreamStats {
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            rtp_stream_stats: RTCRtpStreamStats::new(id, kind, timestamp),
            packets_sent: None,
            bytes_sent: None,
        }
    }
}

impl RTCInboundRtpStreamStats {
    /// Creates inbound stats with every counter missing.
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            received_rtp_stream_stats: RTCReceivedRtpStreamStats::new(id, kind, timestamp),
            bytes_received: None,
            nack_count: None,
        }
    }

    pub fn with_packets_received(mut self, packets_received: u64) -> Self {
        self.received_rtp_stream_stats.packets_received = Some(packets_received);
        self
    }

    pub fn with_packets_lost(mut self, packets_lost: i64) -> Self {
        self.received_rtp_stream_stats.packets_lost = Some(packets_lost);
        self
    }

    pub fn id(&self) -> &str {
        &self.received_rtp_stream_stats.rtp_stream_stats.stats.id
    }

    pub fn kind(&self) -> MediaKind {
        self.received_rtp_stream_stats.rtp_stream_stats.kind
    }

    pub fn timestamp(&self) -> f64 {
        self.received_rtp_stream_stats.rtp_stream_stats.stats.timestamp
    }
}

impl RTCOutboundRtpStreamStats {
    /// Creates outbound stats with every counter missing.
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            sent_rtp_stream_stats: RTCSentRtpStreamStats::new(id, kind, timestamp),
            nack_count: None,
        }
    }

    pub fn with_packets_sent(mut self, packets_sent: u64) -> Self {
        self.sent_rtp_stream_stats.packets_sent = Some(packets_sent);
        self
    }

    pub fn id(&self) -> &str {
        &self.sent_rtp_stream_stats.rtp_stream_stats.stats.id
    }

    pub fn kind(&self) -> MediaKind {
        self.sent_rtp_stream_stats.rtp_stream_stats.kind
    }

    pub fn timestamp(&self) -> f64 {
        self.sent_rtp_stream_stats.rtp_stream_stats.stats.timestamp
    }
}

impl RTCRemoteInboundRtpStreamStats {
    /// Creates remote inbound stats with every counter missing.
    pub fn new(id: impl Into<String>, kind: MediaKind, timestamp: f64) -> Self {
        Self {
            received_rtp_stream_stats: RTCReceivedRtpStreamStats::new(id, kind, timestamp),
            local_id: None,
            round_trip_time: None,
            fraction_lost: None,
        }
    }

    pub fn with_packets_received(mut self, packets_received: u64) -> Self {
        self.received_rtp_stream_stats.packets_received = Some(packets_received);
        self
    }

    pub fn with_packets_lost(mut self, packets_lost: i64) -> Self {
        self.received_rtp_stream_stats.packets_lost = Some(packets_lost);
        self
    }

    pub fn with_round_trip_time(mut self, round_trip_time: f64) -> Self {
        self.round_trip_time = Some(round_trip_time);
        self
    }

    pub fn id(&self) -> &str {
        &self.received_rtp_stream_stats.rtp_stream_stats.stats.id
    }

    pub fn kind(&self) -> MediaKind {
        self.received_rtp_stream_stats.rtp_stream_stats.kind
    }

    pub fn timestamp(&self) -> f64 {
        self.received_rtp_stream_stats.rtp_stream_stats.stats.timestamp
    }
}
