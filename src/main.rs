use std::net::SocketAddr;
use std::process;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use rac_dashboard::api::KeystoneClient;
use rac_dashboard::config::{self, Settings, DEFAULT_HOST, DEFAULT_PORT};
use rac_dashboard::db::MySqlStore;
use rac_dashboard::services::{get_lease, set_lease, QuotaAggregator};
use rac_dashboard::{build_router, AppState};

fn build_state_from_env(env_file: Option<&str>) -> AppState {
    config::load_env_file(env_file);
    match AppState::from_settings(Settings::from_env()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(%e, "Failed to initialise application state");
            eprintln!("{}: {}", yansi::Paint::red("Failed to initialise"), e);
            process::exit(1);
        }
    }
}

async fn start_server(state: AppState, host: &str, port: u16) {
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(%e, "Invalid host/port format");
            eprintln!("{}: {}", yansi::Paint::red("Invalid host/port format"), e);
            process::exit(1);
        }
    };
    let app = build_router(state);
    tracing::info!(%addr, "Starting dashboard server");
    println!(
        "{} {}",
        yansi::Paint::new("Dashboard running on").green(),
        yansi::Paint::new(format!("http://{}", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(%e, "Server encountered an error while running");
                eprintln!("{}: {}", yansi::Paint::new("Server error").red(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(%e, "Failed to bind to address; is the port already in use?");
            eprintln!(
                "{}: {}\n{}",
                yansi::Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                yansi::Paint::new("Stop the process using this port, or pass a different --port value.").yellow()
            );
            process::exit(1);
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

fn mysql_store_or_exit(settings: &Settings) -> MySqlStore {
    match MySqlStore::connect_lazy(&settings.database) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}: {}", yansi::Paint::red("Database is not configured"), e);
            process::exit(1);
        }
    }
}

#[derive(Parser)]
#[command(
    name = "racdash",
    author,
    version,
    about = "Project administration, quota and usage dashboard",
    long_about = r#"racdash serves a small web dashboard on top of an existing identity, compute, object storage and metrics deployment.

Configuration comes from environment variables, optionally loaded from a .env file with `--env-file`.

Examples:
  1) Run the dashboard:
      racdash serve --host 0.0.0.0 --port 8080
  2) Create the lease and quota tables:
      racdash init-db
  3) Inspect a lease:
      racdash lease get <instance-id> <project-id>
"#,
    after_help = "Use `racdash <subcommand> --help` to get subcommand specific options and usage examples."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable outbound request logging
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value_t = String::from(DEFAULT_HOST))]
        host: String,
        /// Port to bind to
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
    #[command(
        about = "Validate configuration and service connectivity.",
        long_about = "Check that the identity endpoint answers and, when RAC_MYSQL_HOST is set, that the database accepts connections."
    )]
    CheckConfig {
        #[arg(long)]
        env_file: Option<String>,
    },
    /// Create the lease and quota tables if they are missing
    InitDb {
        #[arg(long)]
        env_file: Option<String>,
    },
    #[command(
        about = "Read or write instance lease expirations",
        long_about = "Leases are read from and written to the MySQL database; RAC_MYSQL_HOST must be set."
    )]
    Lease {
        #[command(subcommand)]
        sub: LeaseCommands,
        #[arg(long, global = true)]
        env_file: Option<String>,
    },
    /// Show the quota summary of a project
    Quota {
        #[command(subcommand)]
        sub: QuotaCommands,
        #[arg(long, global = true)]
        env_file: Option<String>,
    },
}

#[derive(Subcommand)]
enum LeaseCommands {
    #[command(about = "Show the lease of an instance")]
    Get {
        instance_id: String,
        project_id: String,
        /// Region; defaults to RAC_REGION
        #[arg(long)]
        region: Option<String>,
    },
    #[command(
        about = "Set the lease of an instance",
        long_about = "Set or replace an expiration. Accepted formats include \"Jan 01, 2030 12:00 PM\", \"2030-01-01 12:00:00\" and RFC 3339."
    )]
    Set {
        instance_id: String,
        project_id: String,
        timestamp: String,
        #[arg(long)]
        region: Option<String>,
    },
}

#[derive(Subcommand)]
enum QuotaCommands {
    #[command(
        about = "Print limits and usage",
        long_about = "Aggregate defaults, overrides and usage for a project. Object storage figures need a token with access to the project."
    )]
    Show {
        project_id: String,
        /// Token used for the object storage account lookup
        #[arg(long, default_value = "")]
        token: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        rac_dashboard::api::set_silent(true);
    }

    let command = match cli.command {
        Some(c) => c,
        None => {
            let state = build_state_from_env(None);
            start_server(state, DEFAULT_HOST, DEFAULT_PORT).await;
            return;
        }
    };

    match command {
        Commands::Serve { host, port, env_file } => {
            let state = build_state_from_env(env_file.as_deref());
            start_server(state, &host, port).await;
        }
        Commands::CheckConfig { env_file } => {
            config::load_env_file(env_file.as_deref());
            let settings = Settings::from_env();
            let mut ok = true;

            let keystone = KeystoneClient::new(reqwest::Client::new(), &settings.keystone_url);
            match keystone.check_reachable().await {
                Ok(()) => println!("{} {}", yansi::Paint::green("Identity endpoint reachable:"), settings.keystone_url),
                Err(e) => {
                    eprintln!("{} {}: {}", yansi::Paint::red("Identity endpoint failed:"), settings.keystone_url, e);
                    ok = false;
                }
            }

            if settings.database.host.is_some() {
                let store = mysql_store_or_exit(&settings);
                match store.ping().await {
                    Ok(()) => println!("{}", yansi::Paint::green("Database connection succeeded")),
                    Err(e) => {
                        eprintln!("{}: {}", yansi::Paint::red("Database connection failed"), e);
                        ok = false;
                    }
                }
            } else {
                println!("{}", yansi::Paint::yellow("RAC_MYSQL_HOST not set; using the in-memory store"));
            }

            if settings.swift_url.is_none() {
                println!("{}", yansi::Paint::yellow("SWIFT_URL not set; object storage figures will be 0"));
            }

            if !ok {
                process::exit(1);
            }
        }
        Commands::InitDb { env_file } => {
            config::load_env_file(env_file.as_deref());
            let settings = Settings::from_env();
            let store = mysql_store_or_exit(&settings);
            if let Err(e) = store.ensure_schema().await {
                eprintln!("{}: {}", yansi::Paint::red("Failed to create tables"), e);
                process::exit(1);
            }
            println!("{}", yansi::Paint::green("Tables are in place"));
        }
        Commands::Lease { sub, env_file } => {
            config::load_env_file(env_file.as_deref());
            let settings = Settings::from_env();
            let store = mysql_store_or_exit(&settings);
            match sub {
                LeaseCommands::Get {
                    instance_id,
                    project_id,
                    region,
                } => {
                    let region = region.unwrap_or_else(|| settings.region.clone());
                    match get_lease(&store, &instance_id, &project_id, &region).await {
                        Some(lease) => println!("{}", lease),
                        None => {
                            eprintln!("{}", yansi::Paint::yellow("No lease recorded"));
                            process::exit(1);
                        }
                    }
                }
                LeaseCommands::Set {
                    instance_id,
                    project_id,
                    timestamp,
                    region,
                } => {
                    let region = region.unwrap_or_else(|| settings.region.clone());
                    if set_lease(&store, &instance_id, &project_id, &region, &timestamp).await {
                        println!("{} {}", yansi::Paint::green("Lease updated for"), instance_id);
                    } else {
                        eprintln!("{}", yansi::Paint::red("Lease was not written; see the log for details"));
                        process::exit(1);
                    }
                }
            }
        }
        Commands::Quota { sub, env_file } => {
            let state = build_state_from_env(env_file.as_deref());
            if state.settings.database.host.is_none() {
                eprintln!("{}", yansi::Paint::yellow("RAC_MYSQL_HOST not set; showing default limits and zero usage"));
            }
            match sub {
                QuotaCommands::Show { project_id, token } => {
                    let summary = QuotaAggregator::from_state(&state).aggregate(&project_id, &token).await;
                    let mut table = new_table();
                    table.set_header(vec!["Resource", "Used", "Limit", "%"]);
                    for row in summary.rows() {
                        table.add_row(vec![
                            row.label.to_string(),
                            row.used.to_string(),
                            row.limit.to_string(),
                            row.percent.to_string(),
                        ]);
                    }
                    println!("\n{table}\n");
                }
            }
        }
    }
}
