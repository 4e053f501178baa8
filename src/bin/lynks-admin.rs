use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lynks::analytics::AnalyticsReader;
use lynks::config::{Config, DatabaseBackend};
use lynks::models::NewLink;
use lynks::reconcile::Reconciler;
use lynks::store::{LinkStore, MemoryStore, PostgresStore, SqliteStore};
use lynks::visitor;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lynks-admin")]
#[command(about = "Lynks admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a link for a user
    CreateLink {
        /// Owning user id
        user_id: String,
        /// Display title
        title: String,
        /// Destination URL
        url: String,
        /// Link id (random if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Icon name
        #[arg(long)]
        icon: Option<String>,
        /// Display color
        #[arg(long)]
        color: Option<String>,
        /// Ordinal position on the public page
        #[arg(long, default_value_t = 0)]
        position: i64,
        /// Create hidden from the public page
        #[arg(long)]
        hidden: bool,
    },
    /// List a user's links in display order
    ListLinks {
        /// Owning user id
        user_id: String,
    },
    /// Show click stats for a link
    Stats {
        /// Link id
        link_id: String,
        /// Window size in days, ending now
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Recompute cached click counters from the event log
    Reconcile,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store: Arc<dyn LinkStore> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            Arc::new(SqliteStore::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => Arc::new(
            PostgresStore::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Memory => Arc::new(MemoryStore::new()),
    };

    // Ensure database is initialized
    store.init().await?;

    match cli.command {
        Commands::CreateLink {
            user_id,
            title,
            url,
            id,
            icon,
            color,
            position,
            hidden,
        } => {
            let id = id.unwrap_or_else(|| visitor::random_token(12));
            let link = store
                .create_link(NewLink {
                    id,
                    user_id,
                    title,
                    url,
                    icon,
                    color,
                    is_visible: !hidden,
                    position,
                })
                .await?;
            println!("✓ Created link '{}' -> {}", link.id, link.url);
        }
        Commands::ListLinks { user_id } => {
            let links = store.list_links(&user_id).await?;
            if links.is_empty() {
                println!("No links found for user '{}'.", user_id);
            } else {
                println!("{:<16} {:<8} {:<8} {:<24} {}", "Id", "Visible", "Clicks", "Title", "URL");
                println!("{}", "-".repeat(80));
                for link in links {
                    println!(
                        "{:<16} {:<8} {:<8} {:<24} {}",
                        link.id,
                        if link.is_visible { "yes" } else { "no" },
                        link.clicks,
                        link.title,
                        link.url
                    );
                }
            }
        }
        Commands::Stats { link_id, days } => {
            let end = Utc::now().timestamp();
            let start = end - days * 86400;

            let reader = AnalyticsReader::new(Arc::clone(&store));
            let stats = reader.link_stats(&link_id, start, end).await?;

            println!("Link '{}', last {} days:", stats.link_id, days);
            println!("  cached counter:  {}", stats.cached_clicks);
            println!("  events (total):  {}", stats.event_count);
            println!("  unique visitors: {}", stats.unique_visitors);
            match stats.peak_hour {
                Some(hour) => println!("  peak hour (UTC): {:02}:00", hour),
                None => println!("  peak hour (UTC): N/A"),
            }

            let daily = reader.daily_counts(&link_id, start, end).await?;
            if !daily.is_empty() {
                println!("  clicks per day:");
                for day in daily {
                    let date = DateTime::<Utc>::from_timestamp(day.day_start, 0)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| day.day_start.to_string());
                    println!("    {}  {}", date, day.clicks);
                }
            }
        }
        Commands::Reconcile => {
            let report = Reconciler::new(Arc::clone(&store)).reconcile_all().await?;
            println!(
                "✓ Checked {} links, repaired {} counters",
                report.links_checked, report.counters_repaired
            );
        }
    }

    Ok(())
}
