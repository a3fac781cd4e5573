//! Call-center queue views.
//!
//! [`QueueService`] answers the dashboard's questions about a queue: who
//! the agents are (with their tiers and display names), which callers are
//! waiting, and how many. Every operation checks the queue name against the
//! [`QueueRegistry`] before a session is opened, so an unknown or hostile
//! name never reaches the engine.
//!
//! Each operation opens one control-channel session and issues its commands
//! on it in sequence.

use std::collections::BTreeMap;
use std::sync::Arc;

use callstats_esl::parse::{Record, parse_single_value, parse_table};
use callstats_esl::vocabulary::QUEUE_COUNT_MEMBERS;
use callstats_esl::{CommandSet, Connector, TableCommand};
use callstats_types::{Agent, Caller, QueueView, Tier};
use tracing::{debug, warn};

use crate::directory::{DirectoryStore, run_blocking};
use crate::error::CoreError;
use crate::exchange::send_checked;
use crate::registry::QueueRegistry;

/// Builds agent, tier and caller views for registered queues.
pub struct QueueService<C> {
    connector: Arc<C>,
    registry: Arc<dyn QueueRegistry>,
    directory: Arc<dyn DirectoryStore>,
    commands: CommandSet,
    domain: String,
}

impl<C: Connector> QueueService<C> {
    /// Create a service issuing commands for `<queue>@<domain>`.
    pub fn new(
        connector: Arc<C>,
        registry: Arc<dyn QueueRegistry>,
        directory: Arc<dyn DirectoryStore>,
        commands: CommandSet,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            registry,
            directory,
            commands,
            domain: domain.into(),
        }
    }

    /// Whether `name` is a registered queue.
    pub fn validate_queue_name(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Every registered queue, sorted.
    pub fn list_queues(&self) -> Vec<String> {
        self.registry.names()
    }

    fn require_queue(&self, name: &str) -> Result<(), CoreError> {
        if self.validate_queue_name(name) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!("unknown queue `{name}`")))
        }
    }

    /// Agents of `queue` with their tiers merged in and display names
    /// resolved, in the engine's agent-list order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an unregistered queue (no
    /// command is sent), [`CoreError::Channel`] or [`CoreError::Command`]
    /// if the engine fails.
    pub async fn build_agent_view(&self, queue: &str) -> Result<Vec<Agent>, CoreError> {
        self.require_queue(queue)?;
        let mut channel = self.connector.connect().await?;
        self.agents_on(&mut channel, queue).await
    }

    /// Tier rows of `queue`.
    ///
    /// # Errors
    ///
    /// Same as [`QueueService::build_agent_view`].
    pub async fn build_tier_view(&self, queue: &str) -> Result<Vec<Tier>, CoreError> {
        self.require_queue(queue)?;
        let mut channel = self.connector.connect().await?;
        self.tiers_on(&mut channel, queue).await
    }

    /// Callers of `queue` in member-list order.
    ///
    /// # Errors
    ///
    /// Same as [`QueueService::build_agent_view`].
    pub async fn build_caller_view(&self, queue: &str) -> Result<Vec<Caller>, CoreError> {
        self.require_queue(queue)?;
        let mut channel = self.connector.connect().await?;
        self.callers_on(&mut channel, queue).await
    }

    /// Number of members the engine counts for `queue`.
    ///
    /// # Errors
    ///
    /// Same as [`QueueService::build_agent_view`]; also
    /// [`CoreError::Command`] if the reply is not a number.
    pub async fn count_callers(&self, queue: &str) -> Result<u64, CoreError> {
        self.require_queue(queue)?;
        let command = QUEUE_COUNT_MEMBERS
            .render(&[("queue", queue), ("domain", self.domain.as_str())])?;
        let mut channel = self.connector.connect().await?;
        let raw = send_checked(&mut channel, &command).await?;

        let value = parse_single_value(raw.as_str());
        value.parse().map_err(|e| CoreError::Command {
            command: command.as_str().to_owned(),
            reply: format!("expected a count, got `{value}`: {e}"),
        })
    }

    /// Agent and caller views of every registered queue, in name order.
    ///
    /// # Errors
    ///
    /// Returns the first channel or command failure; nothing partial is
    /// returned.
    pub async fn build_all_queues(&self) -> Result<Vec<QueueView>, CoreError> {
        let names = self.registry.names();
        let mut views = Vec::with_capacity(names.len());
        if names.is_empty() {
            return Ok(views);
        }

        let mut channel = self.connector.connect().await?;
        for name in names {
            let agents = self.agents_on(&mut channel, &name).await?;
            let callers = self.callers_on(&mut channel, &name).await?;
            views.push(QueueView::new(name, agents, callers));
        }
        Ok(views)
    }

    async fn agents_on(
        &self,
        channel: &mut C::Channel,
        queue: &str,
    ) -> Result<Vec<Agent>, CoreError> {
        let agent_rows = self.fetch_table(channel, &self.commands.agents, queue).await?;
        let tiers = self.tiers_on(channel, queue).await?;

        let mut agents = merge_agents(agent_rows, tiers);
        self.resolve_names(&mut agents).await;
        Ok(agents)
    }

    async fn tiers_on(
        &self,
        channel: &mut C::Channel,
        queue: &str,
    ) -> Result<Vec<Tier>, CoreError> {
        let rows = self.fetch_table(channel, &self.commands.tiers, queue).await?;
        let fallback_queue = format!("{queue}@{}", self.domain);
        Ok(rows
            .iter()
            .filter_map(|row| tier_from_record(row, &fallback_queue))
            .collect())
    }

    async fn callers_on(
        &self,
        channel: &mut C::Channel,
        queue: &str,
    ) -> Result<Vec<Caller>, CoreError> {
        let rows = self.fetch_table(channel, &self.commands.members, queue).await?;
        let now = chrono::Utc::now().timestamp();
        Ok(rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let position = u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX);
                caller_from_record(position, row, now)
            })
            .collect())
    }

    async fn fetch_table(
        &self,
        channel: &mut C::Channel,
        table: &TableCommand,
        queue: &str,
    ) -> Result<Vec<Record>, CoreError> {
        let command = table
            .template
            .render(&[("queue", queue), ("domain", self.domain.as_str())])?;
        let raw = send_checked(channel, &command).await?;
        let parsed = parse_table(raw.as_str(), &table.schema);
        debug!(
            command = %command,
            rows = parsed.rows.len(),
            skipped = parsed.skipped,
            "fetched table"
        );
        Ok(parsed.rows)
    }

    /// Fill in display names from the directory. A failed lookup leaves
    /// the name empty.
    async fn resolve_names(&self, agents: &mut [Agent]) {
        if agents.is_empty() {
            return;
        }
        let directory = Arc::clone(&self.directory);
        let user_ids: Vec<String> = agents.iter().map(|a| a.user_id().to_owned()).collect();
        let names = run_blocking(move || {
            Ok(user_ids
                .iter()
                .map(|user_id| display_name_or_empty(directory.as_ref(), user_id))
                .collect::<Vec<_>>())
        })
        .await;

        match names {
            Ok(names) => {
                for (agent, name) in agents.iter_mut().zip(names) {
                    agent.name = name;
                }
            }
            Err(e) => warn!(error = %e, "display name lookup failed"),
        }
    }
}

fn display_name_or_empty(directory: &dyn DirectoryStore, user_id: &str) -> String {
    match directory.display_name(user_id) {
        Ok(name) => name.unwrap_or_default(),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "display name lookup failed");
            String::new()
        }
    }
}

/// Join agent rows with tier rows on the agent id.
///
/// Agent order is preserved. Each agent collects every tier whose
/// `agent_id` matches its `name` column; agents without a tier keep an
/// empty list. Tiers naming an agent absent from the agent list are
/// dropped. Rows without a `name` column are skipped.
pub fn merge_agents(agent_rows: Vec<Record>, tiers: Vec<Tier>) -> Vec<Agent> {
    let mut by_agent: BTreeMap<String, Vec<Tier>> = BTreeMap::new();
    for tier in tiers {
        by_agent.entry(tier.agent_id.clone()).or_default().push(tier);
    }

    let mut agents = Vec::with_capacity(agent_rows.len());
    for fields in agent_rows {
        let Some(agent_id) = fields.get("name").cloned() else {
            debug!("agent row without a name column");
            continue;
        };
        let tiers = by_agent.remove(&agent_id).unwrap_or_default();
        agents.push(Agent {
            status: field(&fields, "status").into(),
            state: field(&fields, "state").into(),
            name: String::new(),
            agent_id,
            tiers,
            fields,
        });
    }

    for (agent_id, orphans) in &by_agent {
        debug!(agent = %agent_id, tiers = orphans.len(), "tier rows for unlisted agent");
    }
    agents
}

/// Map a tier row. Rows without an `agent` column yield `None`.
///
/// `fallback_queue` is used when the schema has no `queue` column.
pub fn tier_from_record(row: &Record, fallback_queue: &str) -> Option<Tier> {
    let agent_id = row.get("agent")?.clone();
    Some(Tier {
        queue: row
            .get("queue")
            .cloned()
            .unwrap_or_else(|| fallback_queue.to_owned()),
        agent_id,
        state: field(row, "state"),
        level: row.get("level").and_then(|v| v.parse().ok()),
        position: row.get("position").and_then(|v| v.parse().ok()),
    })
}

/// Map a member row to a caller at `position` (1-based).
///
/// The wait time is `now_epoch - joined_epoch` when the row carries a
/// positive `joined_epoch`, clamped at zero.
pub fn caller_from_record(position: u32, row: &Record, now_epoch: i64) -> Caller {
    let wait_seconds = row
        .get("joined_epoch")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|joined| *joined > 0)
        .map(|joined| {
            let waited = now_epoch.checked_sub(joined).unwrap_or(0);
            u64::try_from(waited).unwrap_or(0)
        });

    let uuid = row
        .get("session_uuid")
        .filter(|v| !v.is_empty())
        .or_else(|| row.get("uuid"))
        .cloned()
        .unwrap_or_default();

    Caller {
        position,
        wait_seconds,
        cid_number: field(row, "cid_number"),
        cid_name: field(row, "cid_name"),
        state: field(row, "state").into(),
        uuid,
    }
}

fn field(row: &Record, column: &str) -> String {
    row.get(column).cloned().unwrap_or_default()
}
