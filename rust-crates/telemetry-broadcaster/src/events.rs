use std::fmt;

/// Connectivity of one upstream link as seen by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

impl LinkState {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
        }
    }
}

/// Status notifications pushed unsolicited to every UI client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastEvent {
    /// `MASTER_STATUS <state>`
    MasterStatus(LinkState),

    /// `SLAVER_STATUS <state>`
    SlaverStatus(LinkState),
}

impl BroadcastEvent {
    /// Wire line including the trailing newline
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for BroadcastEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MasterStatus(state) => write!(f, "MASTER_STATUS {}", state.as_str()),
            Self::SlaverStatus(state) => write!(f, "SLAVER_STATUS {}", state.as_str()),
        }
    }
}
