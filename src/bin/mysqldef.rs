//! mysqldef: idempotent MySQL schema management
//!
//! # Usage
//!
//! ```bash
//! # Apply a schema file
//! mysqldef -u root -p secret app_db --file schema.sql
//!
//! # Show what would run
//! mysqldef app_db --dry-run < schema.sql
//!
//! # Print the current schema
//! mysqldef app_db --export > schema.sql
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use colored::*;
use mysqldef::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mysqldef")]
#[command(version)]
#[command(about = "Idempotent MySQL schema management by declaring the desired DDL", long_about = None)]
#[command(disable_help_flag = true)]
#[command(after_help = "EXAMPLES:
    mysqldef -u root app_db --file schema.sql
    mysqldef -u root app_db --dry-run < schema.sql
    mysqldef -u root app_db --export")]
struct Cli {
    /// Name of the database to manage
    database: String,

    /// MySQL user name [default: root]
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// MySQL user password
    #[arg(short = 'p', long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,

    /// Host to connect to the MySQL server [default: 127.0.0.1]
    #[arg(short = 'h', long)]
    host: Option<String>,

    /// Port used for the connection [default: 3306]
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Path to a unix socket (overrides host and port)
    #[arg(short = 'S', long)]
    socket: Option<PathBuf>,

    /// Read the desired schema from this file rather than stdin
    #[arg(long, value_name = "SQL_FILE")]
    file: Option<PathBuf>,

    /// Don't run DDLs, just show them
    #[arg(long)]
    dry_run: bool,

    /// Just dump the current schema to stdout
    #[arg(long, conflicts_with_all = ["dry_run", "file"])]
    export: bool,

    /// Configuration file [default: <config dir>/mysqldef/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.export {
            Mode::Export
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }

    /// Flags win over the configuration file.
    fn connection(&self, mut base: ConnectionConfig) -> ConnectionConfig {
        if let Some(user) = &self.user {
            base.user = user.clone();
        }
        if let Some(password) = &self.password {
            base.password = Some(password.clone());
        }
        if let Some(host) = &self.host {
            base.host = host.clone();
        }
        if let Some(port) = self.port {
            base.port = port;
        }
        if let Some(socket) = &self.socket {
            base.socket = Some(socket.clone());
        }
        base
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = execute(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let mode = cli.mode();

    let desired = match mode {
        Mode::Export => String::new(),
        Mode::Apply | Mode::DryRun => read_desired(cli.file.as_deref())?,
    };

    let connection = cli.connection(config.connection);
    let mut db = MySqlDatabase::connect(&connection, &cli.database).await?;

    let ctx = RunContext::new(mode, config.defaults);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&mut db, &desired, &ctx, &mut out).await?;
    Ok(())
}

fn read_desired(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut sql = String::new();
            io::stdin()
                .read_to_string(&mut sql)
                .context("failed to read the desired schema from stdin")?;
            Ok(sql)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_database_name_is_required() {
        assert!(Cli::try_parse_from(["mysqldef"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from(["mysqldef", "-u", "app", "-h", "db", "-P", "3307", "app_db"]).unwrap();
        let connection = cli.connection(ConnectionConfig::default());
        assert_eq!(connection.user, "app");
        assert_eq!(connection.host, "db");
        assert_eq!(connection.port, 3307);
        assert_eq!(cli.database, "app_db");
        assert_eq!(cli.mode(), Mode::Apply);
    }

    #[test]
    fn test_modes() {
        let dry = Cli::try_parse_from(["mysqldef", "--dry-run", "db"]).unwrap();
        assert_eq!(dry.mode(), Mode::DryRun);
        let export = Cli::try_parse_from(["mysqldef", "--export", "db"]).unwrap();
        assert_eq!(export.mode(), Mode::Export);
        assert!(Cli::try_parse_from(["mysqldef", "--export", "--dry-run", "db"]).is_err());
    }
}
