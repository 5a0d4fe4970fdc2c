//! Durable user identifier.
//!
//! Each installation is identified by a random v4 UUID generated on first
//! use and stored under [`USER_ID_KEY`] in the preference store. The
//! identifier is loaded once at startup and injected into the publisher.

use rand::RngCore;
use uuid::{Builder, Uuid};

use crate::prefs::{PreferenceError, PreferenceSource, USER_ID_KEY};

/// Generates a new random user identifier.
///
/// Takes the RNG explicitly so callers (and tests) control the source of
/// randomness.
pub fn generate_user_id<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// Returns the stored user identifier, creating and persisting one if absent.
///
/// # Errors
///
/// Returns an error if a newly generated identifier cannot be persisted.
pub fn load_or_create_user_id(prefs: &dyn PreferenceSource) -> Result<String, PreferenceError> {
    if let Some(id) = prefs.get(USER_ID_KEY).filter(|id| !id.is_empty()) {
        if Uuid::parse_str(&id).is_err() {
            log::warn!("Stored user id is not a UUID, keeping it as-is");
        }
        return Ok(id);
    }

    let id = generate_user_id(&mut rand::thread_rng());
    prefs.set(USER_ID_KEY, &id)?;
    log::info!("Generated new durable user id");
    Ok(id)
}
