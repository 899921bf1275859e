//! `groupbuy-dashboard` -- command-line front end for the marketplace.
//!
//! Loads a view or performs an action and prints the result as JSON on
//! stdout. Logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                  | Description                    |
//! |------------------------|----------|--------------------------|--------------------------------|
//! | `API_URL`              | no       | `http://localhost:3000`  | API origin                     |
//! | `API_STAGE`            | no       | `prod`                   | Stage path segment             |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`                     | HTTP timeout                   |
//! | `SESSION_FILE`         | no       | `.groupbuy/session.json` | Persisted session              |
//! | `LOG_FORMAT`           | no       | `text`                   | `json` for JSON log lines      |

use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use groupbuy_client::{ApiClient, ClientConfig, FileSessionStore};
use groupbuy_core::requests::RequestFilter;
use groupbuy_core::session::{Session, TokenSet};
use groupbuy_core::types::DbId;
use groupbuy_core::validation::{CreatePoolInput, JoinPoolInput, NewProductInput};
use groupbuy_dashboard::{Dashboard, DashboardError, DEFAULT_LOG_FILTER};

/// Group-buying marketplace dashboard.
#[derive(Parser, Debug)]
#[command(name = "groupbuy-dashboard", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the signed-in user, role and capabilities.
    Whoami,

    /// Store tokens obtained from the identity provider.
    Login {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        id_token: Option<String>,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        expires_in: i64,
    },

    /// Clear the stored session.
    Logout,

    /// List pools with their status and whether they can be joined.
    Pools,

    /// List the signed-in client's requests.
    Requests {
        /// all, waiting, completed, closed or expired.
        #[arg(long, default_value = "all", value_parser = parse_filter)]
        filter: RequestFilter,
    },

    /// Company sales analytics.
    Analytics,

    /// Join a pool.
    Join {
        #[arg(long)]
        pool_id: DbId,
        #[arg(long)]
        quantity: Option<i32>,
        /// Defaults to the session's email.
        #[arg(long)]
        email: Option<String>,
    },

    /// Create a pool for one of your products, starting today.
    CreatePool {
        #[arg(long)]
        product_id: Option<DbId>,
        #[arg(long)]
        min_quantity: Option<i32>,
        /// Deadline as YYYY-MM-DD.
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },

    /// Add a product.
    CreateProduct {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        image_url: Option<String>,
    },
}

fn parse_filter(raw: &str) -> Result<RequestFilter, String> {
    RequestFilter::from_str_value(raw).ok_or_else(|| format!("unknown filter {raw:?}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{}", e.user_message());
            ExitCode::from(if e.needs_login() { 2 } else { 1 })
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), DashboardError> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(
        base_url = %config.base_url(),
        session_file = %config.session_file.display(),
        "Loaded configuration"
    );

    let store = FileSessionStore::open(&config.session_file)?;
    let api = ApiClient::new(&config)?;
    let mut dashboard = Dashboard::new(api, Session::new(store));
    let now = Utc::now();

    match cli.command {
        Command::Whoami => print_json(&dashboard.session_view(now).await),
        Command::Login {
            access_token,
            id_token,
            refresh_token,
            expires_in,
        } => {
            let tokens = TokenSet {
                access_token,
                id_token,
                refresh_token,
                token_type: Some("Bearer".into()),
                expires_in,
            };
            dashboard.login(&tokens, now)?;
            print_json(&dashboard.session_view(now).await)
        }
        Command::Logout => {
            dashboard.logout()?;
            print_json(&dashboard.session_view(now).await)
        }
        Command::Pools => print_json(dashboard.refresh_pools(now).await?),
        Command::Requests { filter } => print_json(dashboard.refresh_requests(filter, now).await?),
        Command::Analytics => print_json(dashboard.refresh_analytics(now).await?),
        Command::Join {
            pool_id,
            quantity,
            email,
        } => {
            let input = JoinPoolInput { email, quantity };
            print_json(&dashboard.join_pool(pool_id, &input, now).await?)
        }
        Command::CreatePool {
            product_id,
            min_quantity,
            deadline,
        } => {
            let input = CreatePoolInput {
                product_id,
                min_quantity,
                deadline,
            };
            print_json(&dashboard.create_pool(&input, now).await?)
        }
        Command::CreateProduct {
            name,
            description,
            price,
            image_url,
        } => {
            let input = NewProductInput {
                name,
                description,
                unit_price: price,
                image_url,
            };
            print_json(&dashboard.create_product(&input, now).await?)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), DashboardError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
