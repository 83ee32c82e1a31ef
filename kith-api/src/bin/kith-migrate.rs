//! Schema migration CLI.
//!
//! ```text
//! kith-migrate up
//! kith-migrate down [--steps N]
//! kith-migrate status
//! ```

use clap::{Parser, Subcommand};
use kith_api::telemetry::{init_logging, LoggingConfig};
use kith_api::{ApiResult, DbConfig, SchemaMigrator};

#[derive(Debug, Parser)]
#[command(name = "kith-migrate", version, about = "Apply or revert Kith schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations.
    Up,
    /// Revert the newest applied migrations.
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// List every migration and whether it is applied.
    Status,
}

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenvy::dotenv().ok();
    init_logging(&LoggingConfig::from_env())?;
    let cli = Cli::parse();

    let migrator = SchemaMigrator::connect(&DbConfig::from_env()).await?;

    match cli.command {
        Command::Up => {
            let applied = migrator.up().await?;
            println!("Applied {} migration(s): {:?}", applied.len(), applied);
        }
        Command::Down { steps } => {
            let reverted = migrator.down(steps).await?;
            println!("Reverted {} migration(s): {:?}", reverted.len(), reverted);
        }
        Command::Status => {
            for m in migrator.status().await? {
                let state = match m.installed_on {
                    Some(at) => format!("applied {}", at.to_rfc3339()),
                    None => "pending".to_string(),
                };
                println!("{:04}  {:<32} {}", m.version, m.description, state);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_up_takes_no_target() {
        let cli = Cli::try_parse_from(["kith-migrate", "up"]).unwrap();
        assert!(matches!(cli.command, Command::Up));
        assert!(Cli::try_parse_from(["kith-migrate", "up", "--to", "5"]).is_err());
    }

    #[test]
    fn test_down_defaults_to_one_step() {
        let cli = Cli::try_parse_from(["kith-migrate", "down"]).unwrap();
        assert!(matches!(cli.command, Command::Down { steps: 1 }));
    }
}
