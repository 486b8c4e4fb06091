//! Reads the counters of each media kind out of a stats report.
//!
//! When a report carries more than one stream of the same kind, the last one
//! wins. Kinds whose analysis is disabled are skipped.

use super::media_stats::StreamCounters;
use crate::media_kind::KindMap;
use crate::statistics::report::RTCStatsReport;

/// Counters for the sending side of a connection.
///
/// Packets, packets lost and the timestamp come from the remote peer's view
/// of the stream (`remote-inbound-rtp`). If it does not report the received
/// packets, the local `outbound-rtp` sent packets and timestamp are used.
pub(crate) fn sender_counters(
    report: &RTCStatsReport,
    analysis_enabled: &KindMap<bool>,
) -> KindMap<Option<StreamCounters>> {
    let mut counters = KindMap::<Option<StreamCounters>>::default();
    let mut sent = KindMap::<Option<(u64, f64)>>::default();

    for outbound in report.outbound_rtp_streams() {
        let kind = outbound.kind();
        if !analysis_enabled[kind] {
            continue;
        }
        if let Some(packets_sent) = outbound.sent_rtp_stream_stats.packets_sent {
            sent[kind] = Some((packets_sent, outbound.timestamp()));
        }
    }

    for remote_inbound in report.remote_inbound_rtp_streams() {
        let kind = remote_inbound.kind();
        if !analysis_enabled[kind] {
            continue;
        }

        let received = &remote_inbound.received_rtp_stream_stats;
        counters[kind] = Some(StreamCounters {
            packets: received.packets_received,
            packets_lost: received.non_negative_packets_lost(),
            timestamp: received
                .packets_received
                .map(|_| remote_inbound.timestamp()),
            round_trip_time: remote_inbound.round_trip_time,
        });
    }

    for (kind, kind_sent) in sent.iter() {
        let Some((packets_sent, timestamp)) = *kind_sent else {
            continue;
        };

        let kind_counters = counters[kind].get_or_insert_with(StreamCounters::default);
        if kind_counters.packets.is_none() {
            kind_counters.packets = Some(packets_sent);
            kind_counters.timestamp = Some(timestamp);
        }
    }

    counters
}

/// Counters for the receiving side of a connection, all read from the local
/// `inbound-rtp` stats.
pub(crate) fn receiver_counters(
    report: &RTCStatsReport,
    analysis_enabled: &KindMap<bool>,
) -> KindMap<Option<StreamCounters>> {
    let mut counters = KindMap::<Option<StreamCounters>>::default();

    for inbound in report.inbound_rtp_streams() {
        let kind = inbound.kind();
        if !analysis_enabled[kind] {
            continue;
        }

        let received = &inbound.received_rtp_stream_stats;
        counters[kind] = Some(StreamCounters {
            packets: received.packets_received,
            packets_lost: received.non_negative_packets_lost(),
            timestamp: Some(inbound.timestamp()),
            round_trip_time: None,
        });
    }

    counters
}
