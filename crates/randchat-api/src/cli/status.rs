//! Service status dashboard command.

use anyhow::Result;
use console::style;

use crate::http::handlers::stats;
use crate::state::AppState;

/// Display user and talk counts, cache size, and storage location.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stats = stats::collect(state).await?;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "users": stats.users,
            "talks": stats.talks,
            "cached_users": stats.cached_users,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} randchat v{}", style("*").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Users ──").dim());
    println!("  Total:         {}", style(stats.users.total).bold());
    println!("  Full profiles: {}", stats.users.full_profiles);
    println!("  Waiting:       {}", style(stats.users.waiting).yellow());
    println!("  Chatting:      {}", style(stats.users.chatting).green());
    println!();

    println!("  {}", style("── Talks ──").dim());
    println!("  Recorded: {}", style(stats.talks).bold());
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!("  Database: {}", style("SQLite (WAL mode)").dim());
    println!("  Cached:   {} user record(s)", stats.cached_users);
    println!();

    Ok(())
}
