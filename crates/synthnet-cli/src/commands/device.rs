//! Device component registration

use clap::{Args, Subcommand};
use synthnet_storage::{DeviceComponent, DeviceComponentId, NetworkStore, Receptor};
use tracing::info;

use super::Session;
use crate::error::{CliError, CliResult};

/// Manage device components used by device adapters
#[derive(Args, Debug)]
pub struct DeviceCommand {
    #[command(subcommand)]
    pub action: DeviceAction,
}

/// Device component actions
#[derive(Subcommand, Debug)]
pub enum DeviceAction {
    /// Register (or replace) a component
    Add {
        /// Component id
        #[arg(long)]
        id: u32,

        /// Human readable description
        #[arg(long)]
        description: String,

        /// Receptor as ID:ROWS, in layer order
        #[arg(long = "receptor", value_parser = parse_receptor, required = true)]
        receptors: Vec<Receptor>,
    },

    /// Print a component and its receptors
    Show {
        /// Component id
        id: u32,
    },
}

fn parse_receptor(s: &str) -> Result<Receptor, String> {
    let (id, rows) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid receptor `{}`: expected ID:ROWS", s))?;
    let id = id.trim().parse().map_err(|e| format!("invalid receptor id in `{}`: {}", s, e))?;
    let rows = rows.trim().parse().map_err(|e| format!("invalid row count in `{}`: {}", s, e))?;
    Ok(Receptor { id, rows })
}

impl DeviceCommand {
    /// Execute the device command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let mut store = session.open_store()?;
        match self.action {
            DeviceAction::Add { id, description, receptors } => {
                let component = DeviceComponent {
                    id: DeviceComponentId::new(id),
                    description,
                    receptors,
                };
                store.insert_device_component(&component)?;
                info!("Registered {} with {} receptors", component.id, component.receptors.len());
                println!("{} spans {} rows", component.id, component.total_rows());
            }
            DeviceAction::Show { id } => {
                let component = store
                    .device_component(DeviceComponentId::new(id))?
                    .ok_or_else(|| CliError::missing_resource(format!("device component {}", id)))?;
                println!("{} {}", component.id, component.description);
                for receptor in &component.receptors {
                    println!("  receptor {} rows {}", receptor.id, receptor.rows);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_receptor() {
        assert_eq!(parse_receptor("4:2").unwrap(), Receptor { id: 4, rows: 2 });
        assert!(parse_receptor("4").is_err());
        assert!(parse_receptor("x:2").is_err());
    }
}
