mod commands;
mod events;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use commands::settings::SettingsArgs;
use state::{load_engine_config, AppState};

#[derive(Parser, Debug)]
#[command(name = "clipflow-cli", version, about = "Run and inspect clipflow jobs", long_about = None)]
struct Args {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a prompt and run it to completion
    Run {
        prompt: String,
        /// Simulate without publishing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// List jobs, newest first
    List,
    /// Show one job with its stages and logs
    Show {
        /// Job id or unique id prefix
        id: String,
    },
    /// Read or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print current settings
    Show,
    /// Change one or more settings
    Set(SettingsArgs),
}

/// JSON envelope printed for a failed command in `--json` mode.
fn error_envelope(error: &anyhow::Error) -> anyhow::Result<String> {
    let response = commands::ApiResponse::<()>::err(format!("{:#}", error));
    Ok(serde_json::to_string_pretty(&response)?)
}

/// Maps a command result to the process exit.
///
/// In JSON mode a failure is reported once, as an envelope on stdout, and
/// the process exits non-zero. In text mode the error is returned so it is
/// printed to stderr.
fn into_exit_code(result: anyhow::Result<()>, json: bool) -> anyhow::Result<ExitCode> {
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if json => {
            println!("{}", error_envelope(&e)?);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = load_engine_config(args.config.as_ref())?;
    if let Some(database) = args.database {
        config.database_path = Some(database);
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    clipflow::init_logging(&config.logging)?;

    info!("Starting clipflow-cli v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(config, args.json)?;
    info!("Using database at {}", state.database_path().display());

    let result = match args.command {
        Command::Run { prompt, dry_run } => commands::jobs::run(&state, &prompt, dry_run).await,
        Command::List => commands::jobs::list(&state),
        Command::Show { id } => commands::jobs::show(&state, &id),
        Command::Settings { action } => match action {
            SettingsCommand::Show => commands::settings::show(&state),
            SettingsCommand::Set(settings) => commands::settings::set(&state, settings),
        },
    };

    into_exit_code(result, state.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from(["clipflow-cli", "run", "Make 3 clips", "--dry-run"]);
        match args.command {
            Command::Run { prompt, dry_run } => {
                assert_eq!(prompt, "Make 3 clips");
                assert!(dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope() {
        let error = anyhow::anyhow!("job abc123 ended as failed");
        let envelope: serde_json::Value =
            serde_json::from_str(&error_envelope(&error).unwrap()).unwrap();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "job abc123 ended as failed");
    }

    #[test]
    fn test_json_failure_is_reported_once() {
        let exit = into_exit_code(Err(anyhow::anyhow!("no job matches 'zz'")), true);
        assert!(exit.is_ok());
    }

    #[test]
    fn test_text_failure_is_propagated() {
        let exit = into_exit_code(Err(anyhow::anyhow!("no job matches 'zz'")), false);
        assert_eq!(exit.unwrap_err().to_string(), "no job matches 'zz'");
        assert!(into_exit_code(Ok(()), false).is_ok());
        assert!(into_exit_code(Ok(()), true).is_ok());
    }

    #[test]
    fn test_parse_settings_set_with_global_flags() {
        let args = Args::parse_from([
            "clipflow-cli",
            "settings",
            "set",
            "--sub-langs",
            "Arabic, English",
            "--days",
            "Mon-Fri",
            "--database",
            "/tmp/x.db",
        ]);
        assert_eq!(args.database, Some(PathBuf::from("/tmp/x.db")));
        match args.command {
            Command::Settings {
                action: SettingsCommand::Set(settings),
            } => {
                assert_eq!(settings.sub_langs.as_deref(), Some("Arabic, English"));
                assert_eq!(settings.days.as_deref(), Some("Mon-Fri"));
                assert!(settings.logo.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
