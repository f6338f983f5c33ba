//! Monthly expenses command.

use crate::cli::context::{runtime, CommandContext};
use crate::error::{Error, Result};
use crate::model::format_price;
use crate::remote::RemoteStore;
use chrono::Month;
use colored::Colorize;
use std::path::PathBuf;

/// Show the twelve monthly totals.
///
/// # Errors
///
/// Returns an error if the expenses document cannot be read.
pub fn execute(db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let ctx = CommandContext::open(db_path, remote_path)?;
    let expenses = runtime()?
        .block_on(ctx.remote.get_expenses(&ctx.session.user_id))?
        .ok_or_else(|| Error::UserNotFound {
            email: ctx.session.email.clone(),
        })?;

    if json {
        let output = serde_json::json!({
            "months": expenses.months,
            "total": expenses.total(),
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Expenses".bold().underline());
    for (index, amount) in expenses.months.iter().enumerate() {
        let name = u8::try_from(index + 1)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("?", |m| m.name());
        let value = format!("${}", format_price(*amount));
        if *amount > 0.0 {
            println!("  {name:<10} {}", value.green());
        } else {
            println!("  {name:<10} {}", value.dimmed());
        }
    }
    println!();
    println!("  {:<10} ${}", "Total".bold(), format_price(expenses.total()));
    Ok(())
}
