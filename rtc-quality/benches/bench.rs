use criterion::{Criterion, criterion_group, criterion_main};
use rtc_quality::analyzer::{PeerConnectionAnalyzerBuilder, PeerDirection};
use rtc_quality::media_kind::MediaKind;
use rtc_quality::smoother::{SlidingStatSmoother, StatValueType};
use rtc_quality::state::RTCIceConnectionState;
use rtc_quality::statistics::report::RTCStatsReport;
use rtc_quality::statistics::rtp_stream::RTCInboundRtpStreamStats;
use std::hint::black_box;

fn benchmark_smoother(c: &mut Criterion) {
    let mut smoother = SlidingStatSmoother::new(5, StatValueType::Cumulative, 3.0).unwrap();
    let mut value = 0.0;

    c.bench_function("SlidingStatSmoother Add", |b| {
        b.iter(|| {
            value += 10.0;
            smoother.add(black_box(value));
        })
    });

    c.bench_function("SlidingStatSmoother WeightedAverage", |b| {
        b.iter(|| black_box(smoother.weighted_average()))
    });

    c.bench_function("SlidingStatSmoother Median", |b| {
        b.iter(|| black_box(smoother.median()))
    });
}

fn benchmark_analyzer(c: &mut Criterion) {
    let mut analyzer = PeerConnectionAnalyzerBuilder::new().build().unwrap();
    analyzer
        .attach(PeerDirection::Receiver, RTCIceConnectionState::Connected)
        .unwrap();

    let mut packets = 0;
    let mut timestamp = 0.0;

    c.bench_function("PeerConnectionAnalyzer ProcessSnapshot", |b| {
        b.iter(|| {
            packets += 50;
            timestamp += 1000.0;
            let report = RTCStatsReport::new(vec![
                RTCInboundRtpStreamStats::new("in-audio", MediaKind::Audio, timestamp)
                    .with_packets_received(packets)
                    .with_packets_lost(0)
                    .into(),
                RTCInboundRtpStreamStats::new("in-video", MediaKind::Video, timestamp)
                    .with_packets_received(packets * 10)
                    .with_packets_lost(1)
                    .into(),
            ]);
            analyzer.process_snapshot(black_box(&report));
        })
    });
}

criterion_group!(benches, benchmark_smoother, benchmark_analyzer);
criterion_main!(benches);
