//! Call-center queue views.
//!
//! An [`Agent`] is assembled from two engine outputs (the agent list and the
//! tier list of a queue) joined on the agent id. [`Caller`] records come from
//! the queue member list unchanged. [`QueueView`] bundles both for the
//! dashboard's all-queues poll.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentState, AgentStatus, CallerState};

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A call-center agent as seen from one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Agent identity as registered with the engine (e.g. `1000@default`).
    pub agent_id: String,
    /// Display name from the provisioned directory entry, empty when unknown.
    pub name: String,
    /// Availability status (`Available`, `On Break`, `Logged Out`, ...).
    #[ts(type = "string")]
    pub status: AgentStatus,
    /// Call state (`Waiting`, `In a queue call`, `Idle`, ...).
    #[ts(type = "string")]
    pub state: AgentState,
    /// Tier assignments of this agent. Empty when the agent has no tier row.
    pub tiers: Vec<Tier>,
    /// Every column of the agent row, keyed by column name.
    pub fields: BTreeMap<String, String>,
}

impl Agent {
    /// The directory user id behind this agent: the agent id up to `@`.
    pub fn user_id(&self) -> &str {
        self.agent_id
            .split_once('@')
            .map_or(self.agent_id.as_str(), |(user, _)| user)
    }

    /// Whether at least one tier row was merged into this agent.
    pub fn has_tiers(&self) -> bool {
        !self.tiers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Priority assignment of an agent within a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tier {
    /// Queue the tier belongs to.
    pub queue: String,
    /// Agent the tier is assigned to.
    pub agent_id: String,
    /// Tier state (`Ready`, `Standby`, `Offering`, ...). Empty if not reported.
    pub state: String,
    /// Tier level; lower levels are offered calls first.
    pub level: Option<u32>,
    /// Position of the agent within its level.
    pub position: Option<u32>,
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// A caller (queue member) waiting in or being served by a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Caller {
    /// 1-based position in the member list as returned by the engine.
    pub position: u32,
    /// Seconds since the caller joined the queue, when the engine reports it.
    pub wait_seconds: Option<u64>,
    /// Caller id number.
    pub cid_number: String,
    /// Caller id name.
    pub cid_name: String,
    /// Member state (`Waiting`, `Trying`, `Answered`, ...).
    #[ts(type = "string")]
    pub state: CallerState,
    /// Session uuid of the caller's channel.
    pub uuid: String,
}

impl Caller {
    /// Whether the caller is still waiting for an agent.
    pub const fn is_waiting(&self) -> bool {
        self.state.is_waiting()
    }
}

// ---------------------------------------------------------------------------
// QueueView
// ---------------------------------------------------------------------------

/// Combined view of one queue: merged agents plus its callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueueView {
    /// Queue name without the domain suffix.
    pub name: String,
    /// Agents with their tiers merged in.
    pub agents: Vec<Agent>,
    /// Callers in member-list order.
    pub callers: Vec<Caller>,
    /// Number of callers not yet bridged to an agent.
    pub waiting: usize,
}

impl QueueView {
    /// Assemble a view, deriving the waiting count from the callers.
    pub fn new(name: String, agents: Vec<Agent>, callers: Vec<Caller>) -> Self {
        let waiting = callers.iter().filter(|c| c.is_waiting()).count();
        Self {
            name,
            agents,
            callers,
            waiting,
        }
    }
}
