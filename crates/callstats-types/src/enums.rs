//! Agent and member status values reported by the call-center module.
//!
//! The engine reports these as free text. Known values map to a variant;
//! anything else is kept verbatim in `Other` so a newer engine build never
//! breaks a view. On the wire every value is the engine's original string.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Agent status
// ---------------------------------------------------------------------------

/// Whether an agent accepts calls (the `status` column of the agent list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentStatus {
    /// Logged in and offered calls.
    Available,
    /// Logged in, offered calls only when explicitly requested.
    AvailableOnDemand,
    /// Logged in but paused.
    OnBreak,
    /// Not logged in.
    LoggedOut,
    /// A value this build does not know, or an empty column.
    Other(String),
}

impl AgentStatus {
    /// The engine's spelling of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "Available",
            Self::AvailableOnDemand => "Available (On Demand)",
            Self::OnBreak => "On Break",
            Self::LoggedOut => "Logged Out",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the agent can be offered a call.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available | Self::AvailableOnDemand)
    }
}

impl From<&str> for AgentStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "Available" => Self::Available,
            "Available (On Demand)" => Self::AvailableOnDemand,
            "On Break" => Self::OnBreak,
            "Logged Out" => Self::LoggedOut,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for AgentStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<AgentStatus> for String {
    fn from(status: AgentStatus) -> Self {
        match status {
            AgentStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// What an agent is doing right now (the `state` column of the agent list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentState {
    /// Not taking calls.
    Idle,
    /// Ready for the next call.
    Waiting,
    /// A call is being offered.
    Receiving,
    /// Bridged to a caller.
    InQueueCall,
    /// A value this build does not know, or an empty column.
    Other(String),
}

impl AgentState {
    /// The engine's spelling of this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Waiting => "Waiting",
            Self::Receiving => "Receiving",
            Self::InQueueCall => "In a queue call",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for AgentState {
    fn from(raw: &str) -> Self {
        match raw {
            "Idle" => Self::Idle,
            "Waiting" => Self::Waiting,
            "Receiving" => Self::Receiving,
            "In a queue call" => Self::InQueueCall,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for AgentState {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<AgentState> for String {
    fn from(state: AgentState) -> Self {
        match state {
            AgentState::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Caller state
// ---------------------------------------------------------------------------

/// Progress of a queue member (the `state` column of the member list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallerState {
    /// In the queue, no agent offered yet.
    Waiting,
    /// An agent is being offered the call.
    Trying,
    /// Bridged to an agent.
    Answered,
    /// Hung up before being answered.
    Abandoned,
    /// A value this build does not know (including `Unknown`), or an empty
    /// column.
    Other(String),
}

impl CallerState {
    /// The engine's spelling of this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "Waiting",
            Self::Trying => "Trying",
            Self::Answered => "Answered",
            Self::Abandoned => "Abandoned",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the member still waits for an agent.
    pub const fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting | Self::Trying)
    }
}

impl From<&str> for CallerState {
    fn from(raw: &str) -> Self {
        match raw {
            "Waiting" => Self::Waiting,
            "Trying" => Self::Trying,
            "Answered" => Self::Answered,
            "Abandoned" => Self::Abandoned,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for CallerState {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<CallerState> for String {
    fn from(state: CallerState) -> Self {
        match state {
            CallerState::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for CallerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
