//! Session-token storage in the OS keychain.
//!
//! The auth provider lives outside this crate; it hands the embedding app
//! a user id and a bearer token. The token is kept in the system keychain
//! between launches so a session can resume without re-authenticating.

use keyring::Entry;
use tracing::{info, warn};

use crate::error::SwellMateError;

const SERVICE: &str = "swellmate-session";

/// Store the bearer token for the given account.
pub fn store_session_token(account: &str, token: &str) -> Result<(), SwellMateError> {
    info!("Storing session token for account: {}", account);
    let entry = entry_for(account)?;
    entry.set_password(token).map_err(|e| {
        warn!("Failed to store session token for {}: {}", account, e);
        SwellMateError::Storage(e.to_string())
    })
}

/// Load the stored bearer token, if any.
pub fn load_session_token(account: &str) -> Result<Option<String>, SwellMateError> {
    let entry = entry_for(account)?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => {
            info!("No stored session token for account: {}", account);
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to read session token for {}: {}", account, e);
            Err(SwellMateError::Storage(e.to_string()))
        }
    }
}

/// Remove the stored bearer token. Absence is not an error.
pub fn clear_session_token(account: &str) -> Result<(), SwellMateError> {
    info!("Clearing session token for account: {}", account);
    let entry = entry_for(account)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to clear session token for {}: {}", account, e);
            Err(SwellMateError::Storage(e.to_string()))
        }
    }
}

fn entry_for(account: &str) -> Result<Entry, SwellMateError> {
    Entry::new(SERVICE, account).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", account, e);
        SwellMateError::Storage(e.to_string())
    })
}
