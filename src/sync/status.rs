//! Sync status display.

use colored::Colorize;

use crate::error::Result;
use crate::session::Session;
use crate::storage::SqliteStorage;

use super::types::{PendingItem, SyncStatus};

/// Pending-sync snapshot for the signed-in user.
///
/// # Errors
///
/// Returns an error if the cache query fails.
pub fn get_sync_status(cache: &SqliteStorage, session: &Session) -> Result<SyncStatus> {
    let user = session.cache_user();
    let pending_items = cache
        .list_pending_sync()?
        .into_iter()
        .filter(|item| item.user_id == user)
        .map(|item| PendingItem {
            name: item.name,
            action: if item.in_grocery_list { "add" } else { "remove" },
        })
        .collect::<Vec<_>>();

    Ok(SyncStatus {
        pending: pending_items.len(),
        pending_all_users: cache.count_pending_sync(None)?,
        mode: session.mode.to_string(),
        pending_items,
    })
}

/// Print sync status to stdout.
pub fn print_status(status: &SyncStatus) {
    println!("{}", "Sync Status".bold().underline());
    println!();
    println!("  Mode:    {}", status.mode);

    if status.pending == 0 {
        println!("  {}", "Everything is synced.".green());
    } else {
        println!("{}", "Pending:".yellow().bold());
        for item in &status.pending_items {
            let action = match item.action {
                "add" => "+".green(),
                _ => "-".red(),
            };
            println!("  {action} {}", item.name);
        }
        println!("  {}: {}", "Total".bold(), status.pending);
        println!();
        println!("Run {} to push changes.", "chomp sync run".cyan());
    }

    let others = status.pending_all_users - status.pending;
    if others > 0 {
        println!("  {others} pending record(s) belong to other cached users.");
    }
}
