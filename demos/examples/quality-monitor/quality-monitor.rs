use anyhow::Result;
use clap::Parser;
use log::{debug, trace};
use quality::analyzer::{
    ConnectionEvent, PeerConnectionAnalyzer, PeerConnectionAnalyzerBuilder, PeerDirection,
    StatsResponse,
};
use quality::media_kind::MediaKind;
use quality::sansio::Protocol;
use quality::state::RTCIceConnectionState;
use quality::statistics::report::{RTCStatsReport, RTCStatsReportEntry};
use quality::statistics::rtp_stream::{
    RTCInboundRtpStreamStats, RTCOutboundRtpStreamStats, RTCRemoteInboundRtpStreamStats,
};
use rand::Rng;
use rand::rngs::ThreadRng;
use std::io::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};

const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(86400);
const CONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "quality-monitor")]
#[command(author = "Rusty Rain <y@liu.mx>")]
#[command(version = "0.0.0")]
#[command(about = "Monitors the connection quality of a simulated lossy peer connection.")]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    #[arg(short, long, default_value_t = format!("INFO"))]
    log_level: String,
    #[arg(long, default_value_t = format!("receiver"))]
    direction: String,
    #[arg(long, default_value_t = 0.05)]
    loss_rate: f64,
    #[arg(long, default_value_t = 50.0)]
    audio_packets_per_second: f64,
    #[arg(long, default_value_t = 400.0)]
    video_packets_per_second: f64,
    /// Seconds after which the sender stops sending for `outage_duration`.
    #[arg(long)]
    outage_at: Option<u64>,
    #[arg(long, default_value_t = 8)]
    outage_duration: u64,
    /// Seconds after which the connection is closed.
    #[arg(long, default_value_t = 30)]
    duration: u64,
}

/// Packets of one media kind flowing through the simulated link.
struct SimulatedStream {
    kind: MediaKind,
    packets_per_second: f64,
    pending: f64,
    packets_sent: u64,
    packets_received: u64,
}

/// Lossy link between two peers, producing the stats both ends would report.
struct SimulatedLink {
    rng: ThreadRng,
    started: Instant,
    last: Instant,
    loss_rate: f64,
    outage: bool,
    streams: Vec<SimulatedStream>,
}

impl SimulatedLink {
    fn new(now: Instant, loss_rate: f64, audio_pps: f64, video_pps: f64) -> Self {
        let stream = |kind, packets_per_second| SimulatedStream {
            kind,
            packets_per_second,
            pending: 0.0,
            packets_sent: 0,
            packets_received: 0,
        };

        Self {
            rng: rand::rng(),
            started: now,
            last: now,
            loss_rate,
            outage: false,
            streams: vec![
                stream(MediaKind::Audio, audio_pps),
                stream(MediaKind::Video, video_pps),
            ],
        }
    }

    fn advance(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        if self.outage {
            return;
        }

        for stream in &mut self.streams {
            stream.pending += stream.packets_per_second * elapsed;
            let packets = stream.pending.floor();
            stream.pending -= packets;

            for _ in 0..packets as u64 {
                stream.packets_sent += 1;
                if self.rng.random::<f64>() >= self.loss_rate {
                    stream.packets_received += 1;
                }
            }
        }
    }

    fn report(&mut self, direction: PeerDirection, now: Instant) -> RTCStatsReport {
        let timestamp = now.saturating_duration_since(self.started).as_secs_f64() * 1000.0;
        let mut entries: Vec<RTCStatsReportEntry> = vec![];

        for stream in &self.streams {
            let packets_lost = (stream.packets_sent - stream.packets_received) as i64;
            match direction {
                PeerDirection::Receiver => {
                    entries.push(
                        RTCInboundRtpStreamStats::new(
                            format!("IT-{}", stream.kind),
                            stream.kind,
                            timestamp,
                        )
                        .with_packets_received(stream.packets_received)
                        .with_packets_lost(packets_lost)
                        .into(),
                    );
                }
                PeerDirection::Sender => {
                    entries.push(
                        RTCOutboundRtpStreamStats::new(
                            format!("OT-{}", stream.kind),
                            stream.kind,
                            timestamp,
                        )
                        .with_packets_sent(stream.packets_sent)
                        .into(),
                    );
                    entries.push(
                        RTCRemoteInboundRtpStreamStats::new(
                            format!("RI-{}", stream.kind),
                            stream.kind,
                            timestamp - 10.0,
                        )
                        .with_packets_received(stream.packets_received)
                        .with_packets_lost(packets_lost)
                        .with_round_trip_time(self.rng.random_range(0.02..0.08))
                        .into(),
                    );
                }
            }
        }

        RTCStatsReport::new(entries)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = log::LevelFilter::from_str(&cli.log_level)?;
    if cli.debug {
        env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] {} - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    chrono::Local::now().format("%H:%M:%S.%6f"),
                    record.args()
                )
            })
            .filter(None, log_level)
            .init();
    }

    let direction = PeerDirection::from_str(&cli.direction)?;
    let (stop_tx, stop_rx) = broadcast::channel::<()>(1);

    println!("Press Ctrl-C to stop");
    std::thread::spawn(move || {
        let mut stop_tx = Some(stop_tx);
        ctrlc::set_handler(move || {
            if let Some(stop_tx) = stop_tx.take() {
                let _ = stop_tx.send(());
            }
        })
        .expect("Error setting Ctrl-C handler");
    });

    if let Err(err) = run(stop_rx, direction, cli).await {
        eprintln!("run got error: {}", err);
    }

    Ok(())
}

async fn run(mut stop_rx: broadcast::Receiver<()>, direction: PeerDirection, cli: Cli) -> Result<()> {
    let started = Instant::now();
    let connect_at = started + CONNECT_DELAY;
    let end_at = started + Duration::from_secs(cli.duration);
    let outage = cli.outage_at.map(|outage_at| {
        let from = started + Duration::from_secs(outage_at);
        (from, from + Duration::from_secs(cli.outage_duration))
    });

    let mut link = SimulatedLink::new(
        started,
        cli.loss_rate,
        cli.audio_packets_per_second,
        cli.video_packets_per_second,
    );
    let mut rng = rand::rng();

    let mut analyzer = PeerConnectionAnalyzerBuilder::new().build()?;
    for kind in MediaKind::ALL {
        analyzer.on_connection_quality_change(kind, move |analyzer, quality| {
            let sample = analyzer.media_stats(kind).sample();
            println!(
                "{kind} connection quality has changed: {quality} (lost ratio {:.3}, packets/s {:.1})",
                sample.packets_lost_ratio.weighted_average,
                sample.packets_per_second.weighted_average,
            );
        });
    }
    analyzer.attach(direction, RTCIceConnectionState::Checking)?;

    let (response_tx, mut response_rx) = mpsc::channel::<StatsResponse>(8);
    let mut ice_connection_state = RTCIceConnectionState::Checking;

    'EventLoop: loop {
        let now = Instant::now();
        if now >= end_at {
            break 'EventLoop;
        }
        if ice_connection_state == RTCIceConnectionState::Checking && now >= connect_at {
            ice_connection_state = RTCIceConnectionState::Connected;
            println!("ICE Connection State has changed: {ice_connection_state}");
            analyzer.handle_event(ConnectionEvent::IceConnectionStateChange(
                ice_connection_state,
            ))?;
        }

        link.outage = outage.is_some_and(|(from, to)| from <= now && now < to);
        link.advance(now);

        while let Some(request) = analyzer.poll_write() {
            let response = StatsResponse {
                request_id: request.id,
                report: link.report(direction, now),
            };
            let delay = Duration::from_millis(rng.random_range(10..200));
            let response_tx = response_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = response_tx.send(response).await;
            });
        }

        while let Some(event) = analyzer.poll_event() {
            trace!("quality change event {event:?}");
        }

        let mut eto = analyzer
            .poll_timeout()
            .unwrap_or(now + DEFAULT_TIMEOUT_DURATION)
            .min(end_at);
        if ice_connection_state == RTCIceConnectionState::Checking {
            eto = eto.min(connect_at);
        }

        let delay_from_now = eto
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::from_secs(0));
        if delay_from_now.is_zero() {
            analyzer.handle_timeout(Instant::now())?;
            continue;
        }

        let timer = tokio::time::sleep(delay_from_now);
        tokio::pin!(timer);

        tokio::select! {
            biased;

            _ = stop_rx.recv() => {
                trace!("quality monitor exit loop");
                break 'EventLoop;
            }
            res = response_rx.recv() => {
                match res {
                    Some(response) => {
                        debug!("stats response {}", response.request_id);
                        analyzer.handle_read(response)?;
                    }
                    None => {
                        eprintln!("response_rx closed");
                        break 'EventLoop;
                    }
                }
            }
            _ = timer.as_mut() => {
                analyzer.handle_timeout(Instant::now())?;
            }
        }
    }

    print_summary(&analyzer)?;

    analyzer.handle_event(ConnectionEvent::IceConnectionStateChange(
        RTCIceConnectionState::Closed,
    ))?;
    analyzer.close()?;

    Ok(())
}

fn print_summary(analyzer: &PeerConnectionAnalyzer) -> Result<()> {
    println!("\n=== Connection Quality ===");
    for kind in MediaKind::ALL {
        println!(
            "{kind}: {}\n{}",
            analyzer.connection_quality(kind),
            serde_json::to_string_pretty(&analyzer.media_stats(kind).sample())?
        );
    }
    println!("==========================\n");
    Ok(())
}
