//! Catalog commands: store selection and product search.

use crate::catalog::{CatalogClient, CatalogService};
use crate::cli::context::{runtime, CommandContext};
use crate::config::{load_config, AppConfig};
use crate::error::{Error, Result};
use crate::model::Product;
use colored::Colorize;
use std::path::PathBuf;
use tracing::warn;

fn catalog_service(config: &AppConfig, store_id: Option<String>) -> Result<CatalogService<CatalogClient>> {
    let client = CatalogClient::new(
        &config.catalog.base_url,
        &config.catalog.client_id,
        &config.catalog.client_secret,
    )?;
    Ok(CatalogService::new(client)
        .with_fallback_store(config.catalog.fallback_store.clone())
        .with_store(store_id))
}

/// Select the store nearest to a coordinate and remember it.
///
/// # Errors
///
/// Returns `Catalog` when no store could be selected at all.
pub fn store(
    latitude: f64,
    longitude: f64,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let config = load_config()?;
    let mut service = catalog_service(&config, None)?;

    let selection = runtime()?.block_on(service.initialize_store(latitude, longitude));
    let Some(store_id) = selection.store_id.clone() else {
        return Err(Error::Catalog(
            selection
                .message
                .unwrap_or_else(|| "no store selected".to_string()),
        ));
    };

    ctx.session.store_id = Some(store_id.clone());
    ctx.save_session()?;

    if json {
        println!("{}", serde_json::to_string(&selection)?);
    } else {
        if let Some(message) = &selection.message {
            println!("{}", message.yellow());
        }
        println!("Selected store {}", store_id.bold());
    }
    Ok(())
}

/// Search the selected store.
///
/// # Errors
///
/// Returns an error if the session or cache cannot be opened.
pub fn search(
    term: &str,
    no_cache: bool,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;
    let config = load_config()?;
    let mut service = catalog_service(&config, ctx.session.store_id.clone())?;

    let outcome = runtime()?.block_on(service.search(term));

    if !no_cache && !outcome.products.is_empty() {
        if let Some(store_id) = ctx.session.store_id.clone() {
            if let Err(e) = ctx.grocery().cache_products(&outcome.products, &store_id) {
                warn!(error = %e, "Could not cache search results");
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string(&outcome)?);
        return Ok(());
    }

    if let Some(message) = &outcome.message {
        println!("{}", message.yellow());
    }
    print_products(&outcome.products);
    Ok(())
}

pub(crate) fn print_products(products: &[Product]) {
    let width = products.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for product in products {
        println!(
            "  {:<width$}  {}",
            product.name,
            format!("${}", product.price).green()
        );
    }
}
