//! Account commands: register, login, logout, whoami.

use crate::auth;
use crate::cli::context::{open_cache, open_remote, runtime, store_session};
use crate::config::session_path;
use crate::error::{Error, Result};
use crate::session::Session;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct SessionOutput<'a> {
    email: &'a str,
    user_id: &'a str,
    list_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_id: Option<&'a str>,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_sync: Option<usize>,
}

impl<'a> SessionOutput<'a> {
    fn new(session: &'a Session, pending_sync: Option<usize>) -> Self {
        Self {
            email: &session.email,
            user_id: session.user_id.as_str(),
            list_id: session.list_id.as_str(),
            store_id: session.store_id.as_deref(),
            mode: session.mode.to_string(),
            pending_sync,
        }
    }
}

/// Create an account and sign in.
///
/// # Errors
///
/// Returns the registration error (mismatch, validation, taken email).
pub fn register(
    email: &str,
    password: &str,
    confirm: Option<&str>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let remote = open_remote(remote_path)?;
    let confirm = confirm.unwrap_or(password);
    let session = runtime()?.block_on(auth::register(&remote, email, password, confirm))?;
    store_session(&session)?;

    if json {
        println!("{}", serde_json::to_string(&SessionOutput::new(&session, None))?);
    } else {
        println!("{} {}", "Registered".green(), session.email.bold());
        println!("Next: {}", "chomp store <lat> <lon>".cyan());
    }
    Ok(())
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns `Auth` for wrong credentials.
pub fn login(email: &str, password: &str, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let remote = open_remote(remote_path)?;
    let session = runtime()?.block_on(auth::sign_in(&remote, email, password))?;
    store_session(&session)?;

    if json {
        println!("{}", serde_json::to_string(&SessionOutput::new(&session, None))?);
    } else {
        println!("{} {}", "Signed in as".green(), session.email.bold());
    }
    Ok(())
}

/// Sign out. Cached records and pending changes are kept.
///
/// # Errors
///
/// Returns an error if the session file cannot be removed.
pub fn logout(json: bool) -> Result<()> {
    let path = session_path()?;
    let was_signed_in = Session::load(&path)?.is_some();
    Session::clear(&path)?;

    if json {
        println!("{}", serde_json::json!({ "signed_out": was_signed_in }));
    } else if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

/// Show the signed-in account.
///
/// # Errors
///
/// Returns `NotSignedIn` without a session.
pub fn whoami(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let session = Session::load(&session_path()?)?.ok_or(Error::NotSignedIn)?;
    let cache = open_cache(db_path)?;
    let pending = cache.count_pending_sync(Some(session.cache_user()))?;

    if json {
        println!("{}", serde_json::to_string(&SessionOutput::new(&session, Some(pending)))?);
        return Ok(());
    }

    println!("{}", session.email.bold());
    println!("  User:    {}", session.user_id);
    println!("  List:    {}", session.list_id);
    println!(
        "  Store:   {}",
        session.store_id.as_deref().unwrap_or("(none selected)")
    );
    println!("  Mode:    {}", session.mode);
    if pending > 0 {
        println!("  Pending: {}", pending.to_string().yellow());
    }
    Ok(())
}
