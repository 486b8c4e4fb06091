use std::fmt;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Indicates the state of the ICE connection the analyzer is attached to.
///
/// Quality is only analyzed while the connection is active, see
/// [`is_active`](RTCIceConnectionState::is_active).
///
/// ## String Conversion
///
/// ```
/// use rtc_quality::state::RTCIceConnectionState;
///
/// let state = RTCIceConnectionState::Connected;
/// assert_eq!(state.to_string(), "connected");
///
/// let parsed: RTCIceConnectionState = "checking".into();
/// assert_eq!(parsed, RTCIceConnectionState::Checking);
/// assert!(!parsed.is_active());
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceConnectionState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified,

    /// ICE agent is gathering addresses or waiting to be given remote candidates.
    New,

    /// ICE agent has been given remote candidates and is checking pairs.
    Checking,

    /// ICE agent has found a usable connection for all components.
    Connected,

    /// ICE agent has finished gathering and checking candidates.
    Completed,

    /// ICE connection has been lost, but recovery may be possible.
    ///
    /// Media may still be flowing partially, so the analysis goes on.
    Disconnected,

    /// ICE agent has determined that connection is not possible.
    Failed,

    /// ICE agent has shut down and is no longer processing candidates.
    Closed,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

/// takes a string and converts it to iceconnection_state
impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCIceConnectionState {
    /// Returns true for the states in which media is expected to flow:
    /// connected, completed and disconnected.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RTCIceConnectionState::Connected
                | RTCIceConnectionState::Completed
                | RTCIceConnectionState::Disconnected
        )
    }
}
