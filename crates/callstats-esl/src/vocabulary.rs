//! The engine commands callstats issues.
//!
//! Command text is kept verbatim. Commands that answer with a table carry
//! the column schema of their output; the defaults match the engine's
//! `callcenter_config` and `show` output and can be replaced per command
//! when an engine build prints a different layout.

use crate::command::CommandTemplate;
use crate::parse::TableSchema;

/// `show calls`
pub const SHOW_CALLS: CommandTemplate = CommandTemplate::new("show calls");
/// `show calls count`
pub const SHOW_CALLS_COUNT: CommandTemplate = CommandTemplate::new("show calls count");
/// `show channels`
pub const SHOW_CHANNELS: CommandTemplate = CommandTemplate::new("show channels");
/// `show channels count`
pub const SHOW_CHANNELS_COUNT: CommandTemplate = CommandTemplate::new("show channels count");
/// `status`
pub const STATUS: CommandTemplate = CommandTemplate::new("status");
/// `reloadxml`
pub const RELOAD_XML: CommandTemplate = CommandTemplate::new("reloadxml");
/// `uuid_kill {uuid}`
pub const UUID_KILL: CommandTemplate = CommandTemplate::new("uuid_kill {uuid}");
/// `callcenter_config queue list`
pub const QUEUE_LIST: CommandTemplate = CommandTemplate::new("callcenter_config queue list");
/// `callcenter_config queue list agents {queue}@{domain}`
pub const QUEUE_AGENTS: CommandTemplate =
    CommandTemplate::new("callcenter_config queue list agents {queue}@{domain}");
/// `callcenter_config queue list tiers {queue}@{domain}`
pub const QUEUE_TIERS: CommandTemplate =
    CommandTemplate::new("callcenter_config queue list tiers {queue}@{domain}");
/// `callcenter_config queue list members {queue}@{domain}`
pub const QUEUE_MEMBERS: CommandTemplate =
    CommandTemplate::new("callcenter_config queue list members {queue}@{domain}");
/// `callcenter_config queue count members {queue}@{domain}`
pub const QUEUE_COUNT_MEMBERS: CommandTemplate =
    CommandTemplate::new("callcenter_config queue count members {queue}@{domain}");

const QUEUE_COLUMNS: &[&str] = &[
    "name",
    "strategy",
    "moh_sound",
    "time_base_score",
    "tier_rules_apply",
    "tier_rule_wait_second",
    "tier_rule_wait_multiply_level",
    "tier_rule_no_agent_no_wait",
    "discard_abandoned_after",
    "abandoned_resume_allowed",
    "max_wait_time",
    "max_wait_time_with_no_agent",
    "max_wait_time_with_no_agent_time_reached",
    "record_template",
    "calls_answered",
    "calls_abandoned",
    "ring_progressively_delay",
];

const AGENT_COLUMNS: &[&str] = &[
    "name",
    "instance_id",
    "uuid",
    "type",
    "contact",
    "status",
    "state",
    "max_no_answer",
    "wrap_up_time",
    "reject_delay_time",
    "busy_delay_time",
    "no_answer_delay_time",
    "last_bridge_start",
    "last_bridge_end",
    "last_offered_call",
    "last_status_change",
    "no_answer_count",
    "calls_answered",
    "talk_time",
    "ready_time",
    "external_calls_count",
];

const TIER_COLUMNS: &[&str] = &["queue", "agent", "state", "level", "position"];

const MEMBER_COLUMNS: &[&str] = &[
    "queue",
    "instance_id",
    "uuid",
    "session_uuid",
    "cid_number",
    "cid_name",
    "system_epoch",
    "joined_epoch",
    "rejoined_epoch",
    "bridge_epoch",
    "abandoned_epoch",
    "base_score",
    "skill_score",
    "serving_agent",
    "serving_system",
    "state",
    "score",
];

const CALL_COLUMNS: &[&str] = &[
    "uuid",
    "direction",
    "created",
    "created_epoch",
    "name",
    "state",
    "cid_name",
    "cid_num",
    "ip_addr",
    "dest",
    "presence_id",
    "presence_data",
    "accountcode",
    "callstate",
    "callee_name",
    "callee_num",
    "callee_direction",
    "call_uuid",
    "hostname",
    "sip_hostname",
    "b_uuid",
    "b_direction",
    "b_created",
    "b_created_epoch",
    "b_name",
    "b_state",
    "b_cid_name",
    "b_cid_num",
    "b_ip_addr",
    "b_dest",
    "b_presence_id",
    "b_presence_data",
    "b_accountcode",
    "b_callstate",
    "b_callee_name",
    "b_callee_num",
    "b_callee_direction",
    "b_sent_callee_name",
    "b_sent_callee_num",
    "call_created_epoch",
];

const CHANNEL_COLUMNS: &[&str] = &[
    "uuid",
    "direction",
    "created",
    "created_epoch",
    "name",
    "state",
    "cid_name",
    "cid_num",
    "ip_addr",
    "dest",
    "application",
    "application_data",
    "dialplan",
    "context",
    "read_codec",
    "read_rate",
    "read_bit_rate",
    "write_codec",
    "write_rate",
    "write_bit_rate",
    "secure",
    "hostname",
    "presence_id",
    "presence_data",
    "accountcode",
    "callstate",
    "callee_name",
    "callee_num",
    "callee_direction",
    "call_uuid",
    "sent_callee_name",
    "sent_callee_num",
    "initial_cid_name",
    "initial_cid_num",
    "initial_ip_addr",
    "initial_dest",
    "initial_dialplan",
    "initial_context",
];

/// A command whose response is a delimited table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCommand {
    /// The command to send.
    pub template: CommandTemplate,
    /// Layout of the response.
    pub schema: TableSchema,
}

impl TableCommand {
    /// Pair a template with its schema.
    pub const fn new(template: CommandTemplate, schema: TableSchema) -> Self {
        Self { template, schema }
    }

    /// Replace the schema's columns, keeping the delimiter.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.schema = self.schema.with_columns(columns);
    }
}

/// Every table-producing command, with its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    /// `callcenter_config queue list`
    pub queues: TableCommand,
    /// `callcenter_config queue list agents {queue}@{domain}`
    pub agents: TableCommand,
    /// `callcenter_config queue list tiers {queue}@{domain}`
    pub tiers: TableCommand,
    /// `callcenter_config queue list members {queue}@{domain}`
    pub members: TableCommand,
    /// `show calls`
    pub calls: TableCommand,
    /// `show channels`
    pub channels: TableCommand,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            queues: TableCommand::new(QUEUE_LIST, TableSchema::piped(QUEUE_COLUMNS)),
            agents: TableCommand::new(QUEUE_AGENTS, TableSchema::piped(AGENT_COLUMNS)),
            tiers: TableCommand::new(QUEUE_TIERS, TableSchema::piped(TIER_COLUMNS)),
            members: TableCommand::new(QUEUE_MEMBERS, TableSchema::piped(MEMBER_COLUMNS)),
            calls: TableCommand::new(SHOW_CALLS, TableSchema::comma(CALL_COLUMNS)),
            channels: TableCommand::new(SHOW_CHANNELS, TableSchema::comma(CHANNEL_COLUMNS)),
        }
    }
}
