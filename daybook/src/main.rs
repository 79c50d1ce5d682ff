//! Daybook command line client.
//!
//! Prints the todos of one day and the week around it.
//!
//! ```text
//! daybook [YYYY-MM-DD]
//! ```

use chrono::NaiveDate;
use daybook::{Config, Planner, week_of};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env();

    // Initialize tracing
    let default_filter = config.log.filter.clone();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(base_url = %config.api.base_url, "Configuration loaded");

    let planner = Planner::from_config(&config)?;

    let date = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")?,
        None => planner.today(),
    };

    planner.load(date).await?;
    planner.load_counts(week_of(date)).await?;

    let state = planner.snapshot().await;
    if let Some(error) = &state.last_error {
        warn!(%error, "Todo service reported a failure");
    }

    println!("{}", date.format("%A, %B %-d, %Y"));
    if state.todos.is_empty() {
        println!("  (nothing planned)");
    }
    for todo in &state.todos {
        let mark = if todo.completed { 'x' } else { ' ' };
        println!("  [{mark}] {}", todo.text);
        for subtask in todo.subtasks() {
            let mark = if subtask.completed { 'x' } else { ' ' };
            println!("      [{mark}] {}", subtask.text);
        }
    }

    println!();
    for (day, count) in &state.counts {
        let marker = if *day == date { '>' } else { ' ' };
        println!("{marker} {}  {count}", day.format("%a %m-%d"));
    }

    planner.shutdown().await?;
    info!("Done");

    Ok(())
}
