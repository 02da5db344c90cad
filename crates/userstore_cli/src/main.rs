//! Command-line request handler for the user store.
//!
//! # Responsibility
//! - Turn one command invocation into one service call.
//! - Print a JSON envelope `{ "status": <code>, "body": ... }` and exit
//!   non-zero on failure.
//!
//! Server-side failures print only the generic public message; the detailed
//! cause goes to the log, which is flushed before the process exits.

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use std::process::ExitCode;
use userstore_core::service::user_service::{STATUS_CREATED, STATUS_NO_CONTENT, STATUS_OK};
use userstore_core::{
    core_version, flush_logging, init_logging, BridgeUserRepository, NewAddress, NewContact,
    NewUser, ServiceError, StoreConfig, UserPatch, UserService,
};

#[derive(Parser, Debug)]
#[command(name = "userstore", version, about = "Users, addresses and contacts over SQLite")]
struct Cli {
    /// SQLite database file (defaults to USERSTORE_DB_PATH, else in-memory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error (defaults to USERSTORE_LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files (defaults to USERSTORE_LOG_DIR).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user with address and contact rows.
    Create(CreateArgs),
    /// Fetch one user by id.
    Get { id: String },
    /// List all users.
    List,
    /// Replace a user's first and last name.
    Update {
        id: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Delete every user with the given first name.
    Delete {
        #[arg(long)]
        first_name: String,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    county: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    phone1: Option<String>,
    #[arg(long)]
    phone2: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

impl From<CreateArgs> for NewUser {
    fn from(args: CreateArgs) -> Self {
        NewUser::new(args.first_name, args.last_name)
            .with_address(NewAddress {
                address: args.address,
                city: args.city,
                county: args.county,
                state: args.state,
                zip: args.zip,
            })
            .with_contact(NewContact {
                phone1: args.phone1,
                phone2: args.phone2,
                email: args.email,
            })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = resolve_config(&cli);

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("logging disabled: {err}");
        }
    }

    let exit_code = run(&config, cli.command);
    flush_logging();
    exit_code
}

fn run(config: &StoreConfig, command: Command) -> ExitCode {
    let bridge = match config.open_bridge() {
        Ok(bridge) => bridge,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!("event=cli_start module=cli status=ok version={}", core_version());
    let service = UserService::new(BridgeUserRepository::new(bridge));

    let (status, body) = match handle(&service, command) {
        Ok(response) => response,
        Err(err) => {
            if !err.is_client_error() {
                error!("event=cli_request module=cli status=error error={err}");
            }
            (err.status_code(), json!({ "message": err.public_message() }))
        }
    };

    println!("{}", json!({ "status": status, "body": body }));
    if status < 400 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn resolve_config(cli: &Cli) -> StoreConfig {
    let mut config = StoreConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    config
}

fn handle(
    service: &UserService<BridgeUserRepository>,
    command: Command,
) -> Result<(u16, JsonValue), ServiceError> {
    match command {
        Command::Create(args) => {
            let created = service.create_user(args.into())?;
            Ok((
                STATUS_CREATED,
                json!({ "newId": created.id, "steps": created.steps }),
            ))
        }
        Command::Get { id } => {
            let user = service.get_user(&id)?;
            Ok((STATUS_OK, json!(user)))
        }
        Command::List => {
            let users = service.list_users()?;
            Ok((STATUS_OK, json!(users)))
        }
        Command::Update {
            id,
            first_name,
            last_name,
        } => {
            service.update_user(
                &id,
                UserPatch {
                    first_name,
                    last_name,
                },
            )?;
            Ok((STATUS_NO_CONTENT, JsonValue::Null))
        }
        Command::Delete { first_name } => {
            let deleted = service.delete_users_by_first_name(&first_name)?;
            Ok((
                STATUS_OK,
                json!({ "message": format!("Deleted {deleted} user(s)") }),
            ))
        }
    }
}
