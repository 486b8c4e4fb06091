//! WebRTC Statistics Report types.
//!
//! This module provides the `RTCStatsReport` type which is the return value
//! of `getStats()` and the snapshot consumed by the analyzer on every poll.

use crate::statistics::RTCStatsType;
use crate::statistics::rtp_stream::{
    RTCInboundRtpStreamStats, RTCOutboundRtpStreamStats, RTCRemoteInboundRtpStreamStats,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An entry in the stats report representing a single statistics object.
///
/// Entries are (de)serialized as W3C stats dictionaries, using the `type`
/// member as tag. Dictionaries of any other type are read as
/// [`RTCStatsReportEntry::Unsupported`] and dropped from the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RTCStatsReportEntry {
    /// Inbound RTP stream statistics.
    #[serde(rename = "inbound-rtp")]
    InboundRtp(RTCInboundRtpStreamStats),
    /// Outbound RTP stream statistics.
    #[serde(rename = "outbound-rtp")]
    OutboundRtp(RTCOutboundRtpStreamStats),
    /// Remote inbound RTP stream statistics (from RTCP RR).
    #[serde(rename = "remote-inbound-rtp")]
    RemoteInboundRtp(RTCRemoteInboundRtpStreamStats),
    /// Statistics object of a type the analyzer does not consume.
    #[serde(other)]
    Unsupported,
}

impl RTCStatsReportEntry {
    /// Returns the stats type for this entry.
    pub fn stats_type(&self) -> RTCStatsType {
        match self {
            RTCStatsReportEntry::InboundRtp(_) => RTCStatsType::InboundRTP,
            RTCStatsReportEntry::OutboundRtp(_) => RTCStatsType::OutboundRTP,
            RTCStatsReportEntry::RemoteInboundRtp(_) => RTCStatsType::RemoteInboundRTP,
            RTCStatsReportEntry::Unsupported => RTCStatsType::Unspecified,
        }
    }

    /// Returns the unique ID for this stats entry, if it has one.
    pub fn id(&self) -> Option<&str> {
        match self {
            RTCStatsReportEntry::InboundRtp(s) => Some(s.id()),
            RTCStatsReportEntry::OutboundRtp(s) => Some(s.id()),
            RTCStatsReportEntry::RemoteInboundRtp(s) => Some(s.id()),
            RTCStatsReportEntry::Unsupported => None,
        }
    }
}

impl From<RTCInboundRtpStreamStats> for RTCStatsReportEntry {
    fn from(stats: RTCInboundRtpStreamStats) -> Self {
        RTCStatsReportEntry::InboundRtp(stats)
    }
}

impl From<RTCOutboundRtpStreamStats> for RTCStatsReportEntry {
    fn from(stats: RTCOutboundRtpStreamStats) -> Self {
        RTCStatsReportEntry::OutboundRtp(stats)
    }
}

impl From<RTCRemoteInboundRtpStreamStats> for RTCStatsReportEntry {
    fn from(stats: RTCRemoteInboundRtpStreamStats) -> Self {
        RTCStatsReportEntry::RemoteInboundRtp(stats)
    }
}

/// A collection of statistics objects returned by `getStats()`.
///
/// Provides map-like access to statistics objects keyed by their unique IDs,
/// while iteration follows insertion order.
///
/// # Example
///
/// ```
/// use rtc_quality::media_kind::MediaKind;
/// use rtc_quality::statistics::report::RTCStatsReport;
/// use rtc_quality::statistics::rtp_stream::RTCInboundRtpStreamStats;
///
/// let report = RTCStatsReport::new(vec![
///     RTCInboundRtpStreamStats::new("RTCInboundRTPAudioStream_1", MediaKind::Audio, 1000.0)
///         .with_packets_received(50)
///         .into(),
/// ]);
///
/// assert_eq!(report.len(), 1);
/// assert_eq!(report.inbound_rtp_streams().count(), 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Vec<RTCStatsReportEntry>",
    into = "Vec<RTCStatsReportEntry>"
)]
pub struct RTCStatsReport {
    /// The stats entries indexed by their unique ID.
    entries: HashMap<String, RTCStatsReportEntry>,
    /// Ordered list of entry IDs for iteration.
    order: Vec<String>,
}

impl RTCStatsReport {
    /// Creates a new stats report from a list of entries.
    ///
    /// Unsupported entries are dropped; an entry with an already used ID
    /// replaces the previous one in place.
    pub fn new(entries: Vec<RTCStatsReportEntry>) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(id) = entry.id().map(str::to_owned) else {
                continue;
            };
            if map.insert(id.clone(), entry).is_none() {
                order.push(id);
            }
        }

        Self {
            entries: map,
            order,
        }
    }

    /// Returns the number of stats entries in the report.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the report contains no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets a stats entry by its unique ID.
    pub fn get(&self, id: &str) -> Option<&RTCStatsReportEntry> {
        self.entries.get(id)
    }

    /// Returns true if the report contains an entry with the given ID.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns an iterator over all stats entries.
    pub fn iter(&self) -> impl Iterator<Item = &RTCStatsReportEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Returns an iterator over stats entries of a specific type.
    pub fn iter_by_type(&self, typ: RTCStatsType) -> impl Iterator<Item = &RTCStatsReportEntry> {
        self.iter().filter(move |e| e.stats_type() == typ)
    }

    /// Returns an iterator over all entry IDs.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    // ========================================================================
    // Convenience accessors for specific stats types
    // ========================================================================

    /// Returns an iterator over all inbound RTP stream stats.
    pub fn inbound_rtp_streams(&self) -> impl Iterator<Item = &RTCInboundRtpStreamStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::InboundRtp(s) => Some(s),
            _ => None,
        })
    }

    /// Returns an iterator over all outbound RTP stream stats.
    pub fn outbound_rtp_streams(&self) -> impl Iterator<Item = &RTCOutboundRtpStreamStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::OutboundRtp(s) => Some(s),
            _ => None,
        })
    }

    /// Returns an iterator over all remote inbound RTP stream stats.
    pub fn remote_inbound_rtp_streams(
        &self,
    ) -> impl Iterator<Item = &RTCRemoteInboundRtpStreamStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::RemoteInboundRtp(s) => Some(s),
            _ => None,
        })
    }
}

impl From<Vec<RTCStatsReportEntry>> for RTCStatsReport {
    fn from(entries: Vec<RTCStatsReportEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<RTCStatsReport> for Vec<RTCStatsReportEntry> {
    fn from(mut report: RTCStatsReport) -> Self {
        report
            .order
            .iter()
            .filter_map(|id| report.entries.remove(id))
            .collect()
    }
}

impl FromIterator<RTCStatsReportEntry> for RTCStatsReport {
    fn from_iter<I: IntoIterator<Item = RTCStatsReportEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
