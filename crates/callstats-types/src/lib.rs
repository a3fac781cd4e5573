//! Shared type definitions for the callstats facade.
//!
//! These are the JSON shapes served to the dashboard. Types flow downstream
//! to `TypeScript` via `ts-rs` so the dashboard and the API agree on field
//! names.
//!
//! # Modules
//!
//! - [`queue`] -- Call-center views: agents, tiers, callers, per-queue rollups
//! - [`enums`] -- Agent status, agent state and caller state values
//! - [`directory`] -- Extension provisioning request and directory entries

pub mod directory;
pub mod enums;
pub mod queue;

// Re-export all public types at crate root for convenience.
pub use directory::{DirectoryEntry, ExtensionRequest, ProvisionedUser};
pub use enums::{AgentState, AgentStatus, CallerState};
pub use queue::{Agent, Caller, QueueView, Tier};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the dashboard.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::queue::Agent::export_all();
        let _ = crate::queue::Tier::export_all();
        let _ = crate::queue::Caller::export_all();
        let _ = crate::queue::QueueView::export_all();
        let _ = crate::directory::ExtensionRequest::export_all();
        let _ = crate::directory::DirectoryEntry::export_all();
        let _ = crate::directory::ProvisionedUser::export_all();
    }
}
