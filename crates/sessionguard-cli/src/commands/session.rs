//! Session management CLI commands.

use std::time::Duration;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use sessionguard_auth::registry::SessionSweeper;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::types::{DeviceType, PageRequest};
use sessionguard_entity::session::SessionView;
use sessionguard_service::{SessionFilter, SessionQueryService, SessionTerminator};

use crate::output::{self, OutputFormat};

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List sessions, newest first
    List {
        /// Only this user's sessions
        #[arg(short, long)]
        user: Option<String>,
        /// Device name contains (case-insensitive)
        #[arg(long)]
        device_name: Option<String>,
        /// Exact device type (PC, MOBILE, WEB, MINI_PROGRAM, UNKNOWN)
        #[arg(long, value_parser = parse_device_type)]
        device_type: Option<DeviceType>,
        /// IP contains
        #[arg(long)]
        ip: Option<String>,
        /// Location contains
        #[arg(long)]
        location: Option<String>,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: i64,
        /// Page size
        #[arg(long, default_value_t = 20)]
        page_size: i64,
        /// Return every matching session
        #[arg(long)]
        all: bool,
    },
    /// Show one session with its token state
    Show {
        /// Session ID
        id: String,
    },
    /// Kill a specific session
    Kill {
        /// Session ID
        id: String,
        /// Only kill it if it belongs to this user
        #[arg(long)]
        owner: Option<String>,
    },
    /// Kill several sessions
    KillMany {
        /// Session IDs
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Kill all sessions of a user
    KillUser {
        /// Username
        username: String,
        /// Only sessions of this device type
        #[arg(long, value_parser = parse_device_type)]
        device_type: Option<DeviceType>,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Remove stale index entries
    Prune {
        /// Only this user; every user when omitted
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Count live sessions
    Count {
        /// Only this user's sessions
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    id: String,
    /// Username
    username: String,
    /// Device Type
    device_type: String,
    /// Device Name
    device_name: String,
    /// IP Address
    ip: String,
    /// Location
    location: String,
    /// Login Time
    login_time: String,
}

impl From<&SessionView> for SessionRow {
    fn from(s: &SessionView) -> Self {
        Self {
            id: s.id.clone(),
            username: s.username.clone(),
            device_type: s.device_type.to_string(),
            device_name: s.device_name.clone(),
            ip: s.ip.clone(),
            location: s.location.clone(),
            login_time: s
                .login_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn parse_device_type(value: &str) -> Result<DeviceType, String> {
    let parsed = DeviceType::parse(value);
    if parsed == DeviceType::Unknown && !value.trim().eq_ignore_ascii_case("unknown") {
        return Err(format!("unrecognized device type '{value}'"));
    }
    Ok(parsed)
}

fn confirm(prompt: &str) -> Result<bool, AppError> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let registry = super::connect_registry(config).await?;
    let query = SessionQueryService::new(registry.clone());
    let terminator = SessionTerminator::new(registry.clone());

    match &args.command {
        SessionCommand::List {
            user,
            device_name,
            device_type,
            ip,
            location,
            page,
            page_size,
            all,
        } => {
            let filter = SessionFilter {
                device_name: device_name.clone(),
                device_type: *device_type,
                ip: ip.clone(),
                location: location.clone(),
            };
            let request = if *all {
                PageRequest::unpaged()
            } else {
                PageRequest::new(*page, *page_size)
            };

            let result = match user {
                Some(username) => query.list_for_user(username, &filter, request).await?,
                None => query.list_all(&filter, request).await?,
            };

            let rows: Vec<SessionRow> = result.items.iter().map(SessionRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table && !*all {
                println!(
                    "Page {}/{} ({} total)",
                    result.page, result.total_pages, result.total
                );
            }
        }
        SessionCommand::Show { id } => {
            let detail = query.session_detail(id).await?;
            output::print_item(&detail, format);
        }
        SessionCommand::Kill { id, owner } => {
            match owner {
                Some(username) => terminator.delete_as_owner(id, username).await?,
                None => terminator.delete_as_admin(id).await?,
            }
            output::print_success(&format!("Session {id} terminated"));
        }
        SessionCommand::KillMany { ids, force } => {
            if !force && !confirm(&format!("Terminate {} sessions?", ids.len()))? {
                println!("Cancelled.");
                return Ok(());
            }
            let count = terminator.delete_many_as_admin(ids).await;
            if (count as usize) < ids.len() {
                output::print_warning(&format!(
                    "Terminated {count} of {} sessions; see log for failures",
                    ids.len()
                ));
            } else {
                output::print_success(&format!("Terminated {count} sessions"));
            }
        }
        SessionCommand::KillUser {
            username,
            device_type,
            force,
        } => {
            if !force && !confirm(&format!("Terminate sessions of '{username}'?"))? {
                println!("Cancelled.");
                return Ok(());
            }
            match device_type {
                Some(device_type) => {
                    if terminator
                        .delete_all_for_user_and_type(username, *device_type)
                        .await?
                    {
                        output::print_success(&format!(
                            "Terminated {device_type} sessions of '{username}'"
                        ));
                    } else {
                        output::print_warning(&format!(
                            "'{username}' has no {device_type} sessions"
                        ));
                    }
                }
                None => {
                    let count = terminator.delete_all_for_user(username).await?;
                    output::print_success(&format!(
                        "Terminated {count} sessions of '{username}'"
                    ));
                }
            }
        }
        SessionCommand::Prune { user } => match user {
            Some(username) => {
                let pruned = registry.prune_expired(username).await;
                output::print_success(&format!("Pruned {pruned} stale sessions of '{username}'"));
            }
            None => {
                let sweeper = SessionSweeper::new(registry, Duration::ZERO);
                let report = sweeper.run_once().await?;
                output::print_success(&format!(
                    "Pruned {} stale sessions across {} users",
                    report.pruned, report.users
                ));
            }
        },
        SessionCommand::Count { user } => match user {
            Some(username) => {
                let count = query.count_for_user(username).await?;
                output::print_kv("Live sessions", &count.to_string());
            }
            None => {
                let count = query.count_all().await?;
                output::print_kv("Live sessions", &count.to_string());
            }
        },
    }

    Ok(())
}
