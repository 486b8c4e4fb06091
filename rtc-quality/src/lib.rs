//! RTC Quality - Sans-IO connection quality analysis for WebRTC peer connections.
//!
//! This crate periodically samples the W3C statistics of a peer connection and
//! classifies the quality of its audio and video into a [`ConnectionQuality`].
//!
//! # Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SlidingStatSmoother`] | Fixed size window of samples with a recency weighted average |
//! | [`PeerConnectionAnalyzer`] | Per connection analyzer, driven through [`sansio::Protocol`] |
//! | [`RTCStatsReport`] | The `getStats()` snapshot the analyzer consumes |
//!
//! For each media kind the analyzer keeps windows of the received (or, for a
//! sender, remotely reported) packets, the lost packets, the lost packets ratio
//! and the packets per second. Once the windows are full the weighted averages
//! of the ratio and the rate decide the quality:
//!
//! ```text
//! lost ratio >= 1          -> NoTransmittedData
//! packets per second < 10  -> VeryBad
//! lost ratio > 0.3         -> VeryBad
//! lost ratio > 0.2         -> Bad
//! lost ratio > 0.1         -> Medium
//! otherwise                -> Good
//! ```
//!
//! # Driving the analyzer
//!
//! The analyzer never performs I/O nor reads the clock on its own, except to
//! arm its first timeout. The caller:
//!
//! 1. attaches it to a connection with
//!    [`attach`](PeerConnectionAnalyzer::attach) and forwards ICE connection
//!    state changes through `handle_event`,
//! 2. calls `handle_timeout` when `poll_timeout` expires,
//! 3. answers every [`StatsRequest`] from `poll_write` with a
//!    [`StatsResponse`] passed to `handle_read`,
//! 4. consumes [`QualityChangeEvent`]s from `poll_event`, or registers
//!    handlers with
//!    [`on_connection_quality_change`](PeerConnectionAnalyzer::on_connection_quality_change).

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod analyzer;
pub mod emitter;
pub mod media_kind;
pub mod quality;
pub mod smoother;
pub mod state;
pub mod statistics;

pub use analyzer::{
    ConnectionEvent, PeerConnectionAnalyzer, PeerConnectionAnalyzerBuilder, PeerDirection,
    QualityChangeEvent, StatsRequest, StatsResponse,
};
pub use media_kind::MediaKind;
pub use quality::ConnectionQuality;
pub use smoother::{SlidingStatSmoother, StatValueType};
pub use statistics::report::RTCStatsReport;

pub use sansio;
pub use shared;
