//! Connection quality analyzer of a single peer connection.
//!
//! [`PeerConnectionAnalyzer`] is a sans-I/O state machine. The caller feeds it
//! ICE connection state changes and timeouts, fulfils the [`StatsRequest`]s it
//! writes by calling `getStats()` on the connection, and hands the results
//! back as [`StatsResponse`]s. Quality changes are reported both to the
//! handlers registered with
//! [`on_connection_quality_change`](PeerConnectionAnalyzer::on_connection_quality_change)
//! and as [`QualityChangeEvent`]s.
//!
//! # Example
//!
//! ```
//! use rtc_quality::analyzer::{
//!     ConnectionEvent, PeerConnectionAnalyzerBuilder, PeerDirection, StatsResponse,
//! };
//! use rtc_quality::media_kind::MediaKind;
//! use rtc_quality::quality::ConnectionQuality;
//! use rtc_quality::sansio::Protocol;
//! use rtc_quality::state::RTCIceConnectionState;
//! use rtc_quality::statistics::report::RTCStatsReport;
//!
//! let mut analyzer = PeerConnectionAnalyzerBuilder::new().build()?;
//! analyzer.attach(PeerDirection::Receiver, RTCIceConnectionState::New)?;
//! analyzer.handle_event(ConnectionEvent::IceConnectionStateChange(
//!     RTCIceConnectionState::Connected,
//! ))?;
//!
//! // Drive the timer; a stats request is written once it expires.
//! let eto = analyzer.poll_timeout().unwrap();
//! analyzer.handle_timeout(eto)?;
//! let request = analyzer.poll_write().unwrap();
//!
//! // ... call getStats() on the connection ...
//! analyzer.handle_read(StatsResponse {
//!     request_id: request.id,
//!     report: RTCStatsReport::default(),
//! })?;
//!
//! assert_eq!(
//!     analyzer.connection_quality(MediaKind::Audio),
//!     ConnectionQuality::Unknown
//! );
//! # Ok::<(), rtc_quality::shared::error::Error>(())
//! ```

mod extract;
mod media_stats;

pub use media_stats::{
    MediaStats, MediaStatsSample, NO_TRANSMITTED_DATA_RATIO, SeriesSample, StreamCounters,
    TIMESTAMPS_WINDOW,
};

use crate::emitter::{EventEmitter, Subscription};
use crate::media_kind::{KindMap, MediaKind};
use crate::quality::ConnectionQuality;
use crate::smoother::DEFAULT_LAST_VALUE_WEIGHT;
use crate::state::RTCIceConnectionState;
use crate::statistics::report::RTCStatsReport;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Default interval between two `getStats()` calls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Default number of samples kept by each window.
pub const DEFAULT_WINDOW: usize = 5;
/// Number of intervals after which an unanswered stats request is given up.
const STATS_REQUEST_TIMEOUT_INTERVALS: u32 = 5;

/// Side of the connection observed by the analyzer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerDirection {
    /// Media is sent; counters come from what the remote peer reports.
    Sender,
    /// Media is received; counters come from the local inbound stats.
    Receiver,
}

const PEER_DIRECTION_SENDER_STR: &str = "sender";
const PEER_DIRECTION_RECEIVER_STR: &str = "receiver";

impl FromStr for PeerDirection {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            PEER_DIRECTION_SENDER_STR => Ok(PeerDirection::Sender),
            PEER_DIRECTION_RECEIVER_STR => Ok(PeerDirection::Receiver),
            _ => Err(Error::ErrUnknownPeerDirection(raw.to_owned())),
        }
    }
}

impl fmt::Display for PeerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PeerDirection::Sender => PEER_DIRECTION_SENDER_STR,
            PeerDirection::Receiver => PEER_DIRECTION_RECEIVER_STR,
        };
        write!(f, "{s}")
    }
}

/// Input events of the analyzer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    IceConnectionStateChange(RTCIceConnectionState),
}

/// Request to call `getStats()` on the observed connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub id: u64,
    pub now: Instant,
}

/// Result of the [`StatsRequest`] with id `request_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsResponse {
    pub request_id: u64,
    pub report: RTCStatsReport,
}

/// Output event written every time the quality of a media kind changes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QualityChangeEvent {
    pub kind: MediaKind,
    pub quality: ConnectionQuality,
}

/// Events handlers can be registered for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnalyzerEvent {
    ConnectionQualityChange(MediaKind),
}

/// Handler called synchronously with the analyzer and the new quality.
pub type QualityChangeHandler = dyn Fn(&PeerConnectionAnalyzer, ConnectionQuality);
/// Registration of a [`QualityChangeHandler`].
pub type QualitySubscription = Subscription<AnalyzerEvent, QualityChangeHandler>;

/// Builder for the [`PeerConnectionAnalyzer`].
///
/// # Example
///
/// ```
/// use rtc_quality::analyzer::PeerConnectionAnalyzerBuilder;
/// use std::time::Duration;
///
/// let analyzer = PeerConnectionAnalyzerBuilder::new()
///     .with_interval(Duration::from_millis(500))
///     .with_window(10)
///     .build()?;
/// # Ok::<(), rtc_quality::shared::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PeerConnectionAnalyzerBuilder {
    interval: Duration,
    window: usize,
    last_value_weight: f64,
}

impl Default for PeerConnectionAnalyzerBuilder {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            window: DEFAULT_WINDOW,
            last_value_weight: DEFAULT_LAST_VALUE_WEIGHT,
        }
    }
}

impl PeerConnectionAnalyzerBuilder {
    /// Create a new builder with default settings.
    ///
    /// Default interval is 1 second, with windows of 5 samples and a last
    /// value weight of 3.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom interval between two `getStats()` calls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of samples kept by the packets, packets lost, lost
    /// packets ratio and packets per second windows.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the weight of the newest sample in the weighted averages.
    pub fn with_last_value_weight(mut self, last_value_weight: f64) -> Self {
        self.last_value_weight = last_value_weight;
        self
    }

    pub fn build(self) -> Result<PeerConnectionAnalyzer> {
        if self.interval.is_zero() {
            return Err(Error::ErrZeroPollInterval);
        }

        let stats =
            KindMap::try_from_fn(|_| MediaStats::new(self.window, self.last_value_weight))?;

        Ok(PeerConnectionAnalyzer {
            interval: self.interval,
            stats,
            analysis_enabled: KindMap::new(true, true),
            connection_quality: KindMap::default(),

            direction: None,
            ice_connection_state: None,

            eto: None,
            next_request_id: 0,
            pending_request: None,

            write_queue: VecDeque::new(),
            event_queue: VecDeque::new(),
            emitter: EventEmitter::new(),
            closed: false,
        })
    }
}

/// Analyzes the quality of the audio and video sent or received through a
/// peer connection.
///
/// The analysis only runs while the connection is attached and its ICE
/// connection state is active (see [`RTCIceConnectionState::is_active`]).
/// Otherwise both kinds are [`ConnectionQuality::Unknown`].
#[derive(Debug)]
pub struct PeerConnectionAnalyzer {
    interval: Duration,
    stats: KindMap<MediaStats>,
    analysis_enabled: KindMap<bool>,
    connection_quality: KindMap<ConnectionQuality>,

    direction: Option<PeerDirection>,
    ice_connection_state: Option<RTCIceConnectionState>,

    /// Next `getStats()` call, `None` when not polling.
    eto: Option<Instant>,
    next_request_id: u64,
    pending_request: Option<(u64, Instant)>,

    write_queue: VecDeque<StatsRequest>,
    event_queue: VecDeque<QualityChangeEvent>,
    emitter: EventEmitter<AnalyzerEvent, QualityChangeHandler>,
    closed: bool,
}

impl PeerConnectionAnalyzer {
    /// Starts observing a connection from the given side.
    ///
    /// Any previously attached connection is detached first, so the windows
    /// always start empty. Polling starts right away if `ice_connection_state`
    /// is active.
    pub fn attach(
        &mut self,
        direction: PeerDirection,
        ice_connection_state: RTCIceConnectionState,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ErrAnalyzerClosed);
        }

        self.detach();

        debug!("attach {direction} connection in state {ice_connection_state}");
        self.direction = Some(direction);
        self.update_ice_connection_state(ice_connection_state);
        Ok(())
    }

    /// Stops observing the connection: polling stops, both kinds become
    /// [`ConnectionQuality::Unknown`] and every window is emptied.
    pub fn detach(&mut self) {
        let Some(direction) = self.direction.take() else {
            return;
        };

        debug!("detach {direction} connection");
        self.ice_connection_state = None;
        self.stop_polling();
        for kind in MediaKind::ALL {
            self.stats[kind].reset();
            self.set_connection_quality(kind, ConnectionQuality::Unknown);
        }
    }

    /// Enables or disables the analysis of a media kind.
    ///
    /// Disabling sets the quality to [`ConnectionQuality::Unknown`] and stops
    /// feeding the kind's windows. Enabling again starts from empty windows.
    pub fn set_analysis_enabled(&mut self, kind: MediaKind, enabled: bool) {
        if self.analysis_enabled[kind] == enabled {
            return;
        }

        debug!("{kind} analysis enabled: {enabled}");
        self.analysis_enabled[kind] = enabled;
        if enabled {
            self.stats[kind].reset();
        } else {
            self.set_connection_quality(kind, ConnectionQuality::Unknown);
        }
    }

    pub fn is_analysis_enabled(&self, kind: MediaKind) -> bool {
        self.analysis_enabled[kind]
    }

    pub fn connection_quality(&self, kind: MediaKind) -> ConnectionQuality {
        self.connection_quality[kind]
    }

    /// Returns the observed side, or `None` when detached.
    pub fn direction(&self) -> Option<PeerDirection> {
        self.direction
    }

    /// Returns the last known state of the attached connection.
    pub fn ice_connection_state(&self) -> Option<RTCIceConnectionState> {
        self.ice_connection_state
    }

    pub fn is_polling(&self) -> bool {
        self.eto.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the windows of a media kind.
    pub fn media_stats(&self, kind: MediaKind) -> &MediaStats {
        &self.stats[kind]
    }

    /// Registers a handler called every time the quality of `kind` changes.
    ///
    /// Handlers are called synchronously, in registration order, before the
    /// call that caused the change returns.
    pub fn on_connection_quality_change(
        &self,
        kind: MediaKind,
        handler: impl Fn(&PeerConnectionAnalyzer, ConnectionQuality) + 'static,
    ) -> QualitySubscription {
        self.emitter
            .on(AnalyzerEvent::ConnectionQualityChange(kind), Rc::new(handler))
    }

    /// Runs one analysis pass over a stats report.
    ///
    /// Ignored unless a connection is attached and active.
    pub fn process_snapshot(&mut self, report: &RTCStatsReport) {
        let (Some(direction), Some(ice_connection_state)) =
            (self.direction, self.ice_connection_state)
        else {
            debug!("not attached, ignoring stats report");
            return;
        };
        if !ice_connection_state.is_active() {
            debug!("connection {ice_connection_state}, ignoring stats report");
            return;
        }

        let counters = match direction {
            PeerDirection::Sender => extract::sender_counters(report, &self.analysis_enabled),
            PeerDirection::Receiver => extract::receiver_counters(report, &self.analysis_enabled),
        };

        for (kind, kind_counters) in counters.iter() {
            if let Some(kind_counters) = kind_counters
                && self.analysis_enabled[kind]
            {
                self.stats[kind].ingest(kind, kind_counters);
            }
        }

        for kind in MediaKind::ALL {
            if self.analysis_enabled[kind] {
                let quality = self.stats[kind].connection_quality();
                self.set_connection_quality(kind, quality);
            }
        }
    }

    fn update_ice_connection_state(&mut self, ice_connection_state: RTCIceConnectionState) {
        self.ice_connection_state = Some(ice_connection_state);

        if ice_connection_state.is_active() {
            if self.eto.is_none() {
                debug!("connection {ice_connection_state}, start polling stats");
                self.eto = Some(Instant::now() + self.interval);
            }
        } else {
            self.stop_polling();
            for kind in MediaKind::ALL {
                self.set_connection_quality(kind, ConnectionQuality::Unknown);
            }
        }
    }

    fn stop_polling(&mut self) {
        if self.eto.take().is_some() {
            debug!("stop polling stats");
        }
        self.pending_request = None;
        self.write_queue.clear();
    }

    fn set_connection_quality(&mut self, kind: MediaKind, quality: ConnectionQuality) {
        if self.connection_quality[kind] == quality {
            return;
        }

        debug!(
            "{kind} connection quality changed from {} to {quality}",
            self.connection_quality[kind]
        );
        self.connection_quality[kind] = quality;
        self.event_queue
            .push_back(QualityChangeEvent { kind, quality });

        for handler in self
            .emitter
            .handlers(&AnalyzerEvent::ConnectionQualityChange(kind))
        {
            handler(&*self, quality);
        }
    }
}

impl sansio::Protocol<StatsResponse, (), ConnectionEvent> for PeerConnectionAnalyzer {
    type Rout = ();
    type Wout = StatsRequest;
    type Eout = QualityChangeEvent;
    type Error = Error;
    type Time = Instant;

    fn handle_read(&mut self, msg: StatsResponse) -> Result<()> {
        match self.pending_request {
            Some((id, _)) if id == msg.request_id => {
                self.pending_request = None;
                self.process_snapshot(&msg.report);
            }
            _ => debug!("discarding stale stats response {}", msg.request_id),
        }
        Ok(())
    }

    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_queue.pop_front()
    }

    fn handle_event(&mut self, evt: ConnectionEvent) -> Result<()> {
        if self.closed {
            return Err(Error::ErrAnalyzerClosed);
        }

        match evt {
            ConnectionEvent::IceConnectionStateChange(ice_connection_state) => {
                if self.direction.is_none() {
                    debug!("not attached, ignoring connection state {ice_connection_state}");
                } else {
                    self.update_ice_connection_state(ice_connection_state);
                }
            }
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_queue.pop_front()
    }

    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        let Some(eto) = self.eto else {
            return Ok(());
        };
        if eto > now {
            return Ok(());
        }
        self.eto = Some(now + self.interval);

        if let Some((id, issued)) = self.pending_request {
            if now.duration_since(issued) < self.interval * STATS_REQUEST_TIMEOUT_INTERVALS {
                trace!("stats request {id} still outstanding");
                return Ok(());
            }
            debug!("stats request {id} timed out");
        }

        self.next_request_id += 1;
        let id = self.next_request_id;
        self.pending_request = Some((id, now));
        self.write_queue.push_back(StatsRequest { id, now });
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.eto
    }

    fn close(&mut self) -> Result<()> {
        self.detach();
        self.emitter.clear();
        self.write_queue.clear();
        self.event_queue.clear();
        self.closed = true;
        Ok(())
    }
}
