//! The registered queue set.
//!
//! Commands are only ever issued for queues in the registry. The set is
//! fixed after startup: it comes from configuration and, optionally, from
//! one `callcenter_config queue list` call made before the server starts.

use std::collections::BTreeSet;

use callstats_esl::parse::parse_table;
use callstats_esl::{CommandSet, Connector};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::exchange::send_checked;

/// Read-only view of the queue names commands may be issued for.
pub trait QueueRegistry: Send + Sync {
    /// Whether `name` is a registered queue. Exact, case-sensitive match.
    fn contains(&self, name: &str) -> bool;

    /// Every registered queue, sorted.
    fn names(&self) -> Vec<String>;
}

/// A registry backed by an immutable sorted set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticQueueRegistry {
    queues: BTreeSet<String>,
}

impl StaticQueueRegistry {
    /// Build a registry from queue names. Blank names are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queues = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        Self { queues }
    }

    /// Number of registered queues.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether no queue is registered.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// A registry holding the union of `self` and `names`.
    #[must_use]
    pub fn extended<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.queues.extend(
            names
                .into_iter()
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
        );
        self
    }
}

impl QueueRegistry for StaticQueueRegistry {
    fn contains(&self, name: &str) -> bool {
        self.queues.contains(name)
    }

    fn names(&self) -> Vec<String> {
        self.queues.iter().cloned().collect()
    }
}

/// Ask the engine which queues it knows about.
///
/// Names are returned without the `@<domain>` suffix. Queues belonging to
/// another domain are ignored.
///
/// # Errors
///
/// Returns [`CoreError::Channel`] if the engine cannot be reached and
/// [`CoreError::Command`] if it refuses the command.
pub async fn discover_queues<C: Connector>(
    connector: &C,
    commands: &CommandSet,
    domain: &str,
) -> Result<Vec<String>, CoreError> {
    let command = commands.queues.template.fixed()?;
    let mut channel = connector.connect().await?;
    let raw = send_checked(&mut channel, &command).await?;

    let table = parse_table(raw.as_str(), &commands.queues.schema);
    let mut names = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let Some(full) = row.get("name") else {
            continue;
        };
        match full.split_once('@') {
            Some((queue, queue_domain)) if queue_domain == domain => {
                names.push(queue.to_owned());
            }
            Some((_, queue_domain)) => {
                warn!(queue = %full, domain = %queue_domain, "ignoring queue from another domain");
            }
            None => names.push(full.clone()),
        }
    }

    info!(count = names.len(), domain = %domain, "discovered queues");
    Ok(names)
}
