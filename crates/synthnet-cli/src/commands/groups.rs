//! Connection group listing

use clap::Args;
use serde::Serialize;
use synthnet_core::{ConnectionType, ParameterBlob};
use synthnet_storage::{ConnectionGroup, NetworkStore, SqliteStore};
use tracing::warn;

use super::Session;
use crate::error::CliResult;

/// List every connection group in the store
#[derive(Args, Debug)]
pub struct GroupsCommand {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// One row of the listing
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    /// Connection group id
    pub id: u32,
    /// Presynaptic layer id
    pub from: u32,
    /// Postsynaptic layer id
    pub to: u32,
    /// Topology name, or the raw id when it is unknown
    pub connection_type: String,
    /// Synapse type id
    pub synapse_type: u16,
    /// Stored connections
    pub connections: u64,
    /// Decoded parameter blob; absent when it does not parse
    pub parameters: Option<ParameterBlob>,
}

impl GroupSummary {
    fn collect(store: &SqliteStore, group: ConnectionGroup) -> CliResult<Self> {
        let connection_type = ConnectionType::from_id(group.connection_type)
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| group.connection_type.to_string());
        let parameters = match ParameterBlob::decode(&group.parameters) {
            Ok(blob) => Some(blob),
            Err(err) => {
                warn!("Group {} has an unreadable parameter blob: {}", group.id, err);
                None
            }
        };
        Ok(Self {
            id: group.id.raw(),
            from: group.from_group.raw(),
            to: group.to_group.raw(),
            connection_type,
            synapse_type: group.synapse_type.raw(),
            connections: store.connection_count(group.id)?,
            parameters,
        })
    }
}

impl GroupsCommand {
    /// Execute the groups command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let store = session.open_store()?;
        let summaries = store
            .connection_groups()?
            .into_iter()
            .map(|group| GroupSummary::collect(&store, group))
            .collect::<CliResult<Vec<_>>>()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        println!(
            "{:>5}  {:>5}  {:>5}  {:<24} {:>7} {:>12}  delays",
            "id", "from", "to", "type", "synapse", "connections"
        );
        for s in &summaries {
            let delays = s
                .parameters
                .as_ref()
                .map(|blob| format!("{}..={}", blob.min_delay, blob.max_delay))
                .unwrap_or_else(|| "?".to_string());
            println!(
                "{:>5}  {:>5}  {:>5}  {:<24} {:>7} {:>12}  {}",
                s.id, s.from, s.to, s.connection_type, s.synapse_type, s.connections, delays
            );
        }
        Ok(())
    }
}
