//! Connection type catalogue

use clap::Args;
use serde::Serialize;
use synthnet_core::{ConnectionType, ConnectionTypeRegistry, ParameterMap, StandardRegistry};

use crate::error::CliResult;

/// Print every connection type with its default parameters
#[derive(Args, Debug)]
pub struct TypesCommand {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct TypeSummary {
    id: u16,
    name: &'static str,
    description: String,
    parameters: ParameterMap,
}

impl TypesCommand {
    /// Execute the types command
    pub async fn execute(self) -> CliResult<()> {
        let registry = StandardRegistry;
        let summaries: Vec<TypeSummary> = ConnectionType::ALL
            .into_iter()
            .map(|t| TypeSummary {
                id: t.id(),
                name: t.name(),
                description: registry.description(t).to_string(),
                parameters: registry.parameters(t),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }

        for s in &summaries {
            println!("{:>2}  {:<24} {}", s.id, s.name, s.description);
            for (name, value) in s.parameters.iter() {
                println!("      {} = {}", name, value);
            }
        }
        Ok(())
    }
}
