//! Favorite and cached-product commands.

use crate::cli::context::{runtime, CommandContext};
use crate::cli::{CacheCommands, FavCommands};
use crate::error::Result;
use crate::grocery::CacheFilter;
use crate::model::Product;
use colored::Colorize;
use std::path::PathBuf;

use super::catalog::print_products;

/// Execute favorite commands.
pub fn execute_fav(
    command: &FavCommands,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;

    match command {
        FavCommands::Add { name, price, store } => {
            let store_id = ctx.store_or_selected(store.as_deref())?;
            let product = Product::new(name.as_str(), price.as_str());
            let item = runtime()?.block_on(ctx.grocery().add_favorite(&product, &store_id))?;
            if json {
                println!("{}", serde_json::to_string(&item)?);
            } else {
                println!("{} {}", "★".yellow(), item.name.bold());
            }
        }
        FavCommands::Remove { name } => {
            let item = ctx.grocery().remove_favorite(name)?;
            if json {
                println!("{}", serde_json::to_string(&item)?);
            } else {
                println!("Removed {} from favorites", item.name.bold());
            }
        }
        FavCommands::List => {
            let products = ctx.grocery().cached_products(CacheFilter::Favorites)?;
            print_list("Favorites", "No favorites yet.", &products, json)?;
        }
    }
    Ok(())
}

/// Execute cache commands.
pub fn execute_cache(
    command: &CacheCommands,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;

    match command {
        CacheCommands::List => {
            let products = ctx.grocery().cached_products(CacheFilter::All)?;
            print_list("Cached Products", "No cached products found", &products, json)?;
        }
        CacheCommands::Clear => {
            let removed = ctx.grocery().clear_cached_products()?;
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("Removed {removed} cached product(s).");
            }
        }
    }
    Ok(())
}

fn print_list(title: &str, empty: &str, products: &[Product], json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({ "items": products, "count": products.len() });
        println!("{}", serde_json::to_string(&output)?);
    } else if products.is_empty() {
        println!("{empty}");
    } else {
        println!("{}", title.bold().underline());
        print_products(products);
    }
    Ok(())
}
