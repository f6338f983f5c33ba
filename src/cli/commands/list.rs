//! Grocery list commands.

use crate::cli::context::{runtime, CommandContext};
use crate::error::Result;
use crate::grocery::{lines_total, GroceryLine};
use crate::model::{format_price, Product};
use crate::session::{ReadMode, RemovalKind};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ListOutput<'a> {
    mode: ReadMode,
    items: &'a [GroceryLine],
    count: usize,
    total: f64,
}

/// Print the grocery list.
///
/// # Errors
///
/// Returns an error if the list cannot be read.
pub fn list(offline: bool, db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    if offline {
        // Not saved: only this read uses the cache
        ctx.session.mode = ReadMode::Offline;
    }
    let mode = ctx.session.mode;
    let lines = runtime()?.block_on(ctx.grocery().load_list())?;
    let total = lines_total(&lines);

    if json {
        let output = ListOutput {
            mode,
            items: &lines,
            count: lines.len(),
            total,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if lines.is_empty() {
        println!("Grocery list is empty.");
        return Ok(());
    }

    println!("{} ({mode})", "Grocery List".bold().underline());
    let width = lines.iter().map(|l| l.name.len()).max().unwrap_or(0);
    for line in &lines {
        let marker = if line.pending { "*".yellow() } else { " ".normal() };
        println!(
            "{marker} {:<width$}  x{:<3} {:>9}  {}",
            line.name,
            line.quantity,
            format!("${}", line.price),
            line.id.dimmed()
        );
    }
    println!();
    println!("  {}: ${}", "Total".bold(), format_price(total));
    if lines.iter().any(|l| l.pending) {
        println!("  {} not synced yet", "*".yellow());
    }
    Ok(())
}

/// Add a product.
///
/// # Errors
///
/// Returns an error if no store is known or the write fails.
pub fn add(
    name: &str,
    price: &str,
    qty: u32,
    store: Option<&str>,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let store_id = ctx.store_or_selected(store)?;
    let product = Product::new(name, price);
    let outcome = runtime()?.block_on(ctx.grocery().add_product(&product, &store_id, qty))?;

    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else if outcome.pending {
        println!("Added {} (offline, will sync)", outcome.name.bold());
    } else {
        println!("Added {} (quantity {})", outcome.name.bold(), outcome.quantity);
    }
    Ok(())
}

/// Remove a product by name.
///
/// # Errors
///
/// Returns `ItemNotFound` when the product is not on the list.
pub fn remove(
    name: &str,
    store: Option<&str>,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let store_id = ctx.store_or_selected(store)?;
    runtime()?.block_on(ctx.grocery().remove_product(name, &store_id))?;

    if json {
        println!("{}", serde_json::json!({ "removed": name, "store_id": store_id }));
    } else {
        println!("Removed {}", name.bold());
    }
    Ok(())
}

/// Change an item's quantity.
///
/// # Errors
///
/// Returns `ItemNotFound` for an unknown id, or `InvalidArgument` offline.
pub fn quantity(
    item_id: &str,
    quantity: u32,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    runtime()?.block_on(ctx.grocery().update_quantity(item_id, quantity))?;
    ctx.save_session()?;

    if json {
        println!("{}", serde_json::json!({ "id": item_id, "quantity": quantity }));
    } else if quantity == 0 {
        println!("Deleted {item_id}. Undo with {}", "chomp undo".cyan());
    } else {
        println!("Quantity set to {quantity}");
    }
    Ok(())
}

/// Delete an item by id.
///
/// # Errors
///
/// Returns `ItemNotFound` for an unknown id.
pub fn delete(item_id: &str, db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    runtime()?.block_on(ctx.grocery().delete_item(item_id))?;
    ctx.save_session()?;

    if json {
        println!("{}", serde_json::json!({ "deleted": item_id }));
    } else {
        println!("Deleted {item_id}. Undo with {}", "chomp undo".cyan());
    }
    Ok(())
}

/// Check an item off.
///
/// # Errors
///
/// Returns `ItemNotFound` for an unknown id, or `InvalidArgument` offline.
pub fn check(item_id: &str, db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let amount = runtime()?.block_on(ctx.grocery().check_item(item_id))?;
    ctx.save_session()?;

    if json {
        println!("{}", serde_json::json!({ "checked": item_id, "amount": amount }));
    } else {
        println!("Checked off, ${} added to expenses", format_price(amount).green());
    }
    Ok(())
}

/// Undo the last delete or quantity change.
///
/// # Errors
///
/// Returns the store's error.
pub fn undo(db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let restored = runtime()?.block_on(ctx.grocery().restore_recently_deleted())?;
    ctx.save_session()?;

    if json {
        println!("{}", serde_json::json!({ "restored": restored }));
        return Ok(());
    }

    match restored {
        None => println!("Nothing to undo."),
        Some(item) => match item.kind {
            RemovalKind::Deleted => println!("Restored {}", item.name.bold()),
            RemovalKind::QuantityChanged => {
                println!("Restored {} to quantity {}", item.name.bold(), item.quantity);
            }
        },
    }
    Ok(())
}
