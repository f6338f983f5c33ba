//! Version command implementation.

use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    schema_version: i32,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let schema_version = crate::storage::CACHE_SCHEMA_VERSION;

    if json {
        let output = VersionOutput {
            version,
            build,
            schema_version,
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
        return Ok(());
    }

    println!("chomp version {version} ({build}, cache schema v{schema_version})");
    Ok(())
}
