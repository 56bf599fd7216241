//! Local credential store.
//!
//! Persists (age, salt, creation time) per user identifier so the salt can be
//! replayed at verification time. The blob format is base64-encoded JSON
//! under the key `zkproof_<userId>`. This is a convenience cache, deliberately NOT
//! hardened against a local attacker with filesystem access.
//!
//! Corrupt or missing entries are indistinguishable to callers: both read as
//! "absent". The store never throws on a bad blob.

use agegate_types::{AgegateError, AgegateResult, Credential, CREDENTIAL_KEY_PREFIX};
use base64::Engine;
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

pub struct CredentialStore {
    _db: Db,
    credentials: Tree,
}

impl CredentialStore {
    pub fn open(path: impl AsRef<Path>) -> AgegateResult<Self> {
        let db = sled::Config::new()
            .path(path.as_ref())
            .open()
            .map_err(|e| AgegateError::Storage(format!("Failed to open database: {}", e)))?;

        Self::from_db(db)
    }

    /// Ephemeral store for tests.
    pub fn in_memory() -> AgegateResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| AgegateError::Storage(format!("Failed to open temp database: {}", e)))?;

        Self::from_db(db)
    }

    fn from_db(db: Db) -> AgegateResult<Self> {
        let credentials = db
            .open_tree("credentials")
            .map_err(|e| AgegateError::Storage(format!("Failed to open credentials tree: {}", e)))?;

        Ok(Self {
            _db: db,
            credentials,
        })
    }

    fn key(user_id: &str) -> String {
        format!("{}{}", CREDENTIAL_KEY_PREFIX, user_id)
    }

    /// Persist a credential. Overwriting is allowed: recreating an identity
    /// supersedes the previous credential.
    pub fn store(&self, user_id: &str, age: u64, salt: &str) -> AgegateResult<()> {
        let credential = Credential {
            age,
            salt: salt.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let blob = encode_blob(&credential)?;

        self.credentials
            .insert(Self::key(user_id), blob.as_bytes())
            .map_err(|e| AgegateError::Storage(format!("Failed to store credential: {}", e)))?;
        self.credentials
            .flush()
            .map_err(|e| AgegateError::Storage(format!("Flush error: {}", e)))?;

        debug!(user_id, "stored age credential");
        Ok(())
    }

    /// Read a credential back. Missing and corrupt entries both return
    /// `None`: a stale or damaged cache must read as "no credential", never
    /// crash the caller.
    pub fn retrieve(&self, user_id: &str) -> Option<Credential> {
        let bytes = self.credentials.get(Self::key(user_id)).ok().flatten()?;
        let blob = String::from_utf8(bytes.to_vec()).ok()?;

        match decode_blob(&blob) {
            Some(credential) => Some(credential),
            None => {
                debug!(user_id, "credential blob undecodable, treating as absent");
                None
            }
        }
    }

    /// Delete a credential. Clearing an absent entry is a no-op.
    pub fn clear(&self, user_id: &str) -> AgegateResult<()> {
        self.credentials
            .remove(Self::key(user_id))
            .map_err(|e| AgegateError::Storage(format!("Failed to clear credential: {}", e)))?;
        self.credentials
            .flush()
            .map_err(|e| AgegateError::Storage(format!("Flush error: {}", e)))?;
        Ok(())
    }

    /// The raw blob for backup, or `None` when absent.
    pub fn export(&self, user_id: &str) -> Option<String> {
        let bytes = self.credentials.get(Self::key(user_id)).ok().flatten()?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    /// Import a previously exported blob. The blob must decode to well-formed
    /// credential JSON before anything is written; malformed input returns
    /// `false` with no partial state.
    pub fn import(&self, user_id: &str, blob: &str) -> bool {
        if decode_blob(blob).is_none() {
            return false;
        }

        let written = self
            .credentials
            .insert(Self::key(user_id), blob.as_bytes())
            .is_ok();
        if written {
            let _ = self.credentials.flush();
        }
        written
    }
}

fn encode_blob(credential: &Credential) -> AgegateResult<String> {
    let json = serde_json::to_string(credential)
        .map_err(|e| AgegateError::Serialization(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

fn decode_blob(blob: &str) -> Option<Credential> {
    let json = base64::engine::general_purpose::STANDARD
        .decode(blob)
        .ok()?;
    serde_json::from_slice(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xabcdef").unwrap();

        let credential = store.retrieve("42").unwrap();
        assert_eq!(credential.age, 25);
        assert_eq!(credential.salt, "0xabcdef");
        assert!(credential.timestamp > 0);
    }

    #[test]
    fn test_missing_reads_as_absent() {
        let store = CredentialStore::in_memory().unwrap();
        assert!(store.retrieve("nobody").is_none());
    }

    #[test]
    fn test_corrupt_blob_reads_as_absent() {
        let store = CredentialStore::in_memory().unwrap();

        // Valid base64 of invalid JSON.
        let garbage = base64::engine::general_purpose::STANDARD.encode("not json at all");
        store
            .credentials
            .insert(CredentialStore::key("42"), garbage.as_bytes())
            .unwrap();
        assert!(store.retrieve("42").is_none());

        // Not even base64.
        store
            .credentials
            .insert(CredentialStore::key("43"), &b"%%%%"[..])
            .unwrap();
        assert!(store.retrieve("43").is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xabc").unwrap();

        store.clear("42").unwrap();
        assert!(store.retrieve("42").is_none());

        // Clearing again is a no-op, not an error.
        store.clear("42").unwrap();
        store.clear("never-existed").unwrap();
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = CredentialStore::in_memory().unwrap();
        source.store("42", 25, "0xabc").unwrap();

        let blob = source.export("42").unwrap();

        let target = CredentialStore::in_memory().unwrap();
        assert!(target.import("42", &blob));

        let credential = target.retrieve("42").unwrap();
        assert_eq!(credential.age, 25);
        assert_eq!(credential.salt, "0xabc");
    }

    #[test]
    fn test_import_rejects_malformed_blob() {
        let store = CredentialStore::in_memory().unwrap();

        assert!(!store.import("42", "definitely not base64 %%%"));
        let garbage = base64::engine::general_purpose::STANDARD.encode("{\"age\": \"not a number\"}");
        assert!(!store.import("42", &garbage));

        // Nothing was written.
        assert!(store.retrieve("42").is_none());
        assert!(store.export("42").is_none());
    }

    #[test]
    fn test_export_absent_is_none() {
        let store = CredentialStore::in_memory().unwrap();
        assert!(store.export("42").is_none());
    }

    #[test]
    fn test_blob_is_base64_json() {
        let store = CredentialStore::in_memory().unwrap();
        store.store("42", 25, "0xabc").unwrap();

        let blob = store.export("42").unwrap();
        let json = base64::engine::general_purpose::STANDARD
            .decode(&blob)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(value["age"], 25);
        assert_eq!(value["salt"], "0xabc");
        assert!(value["timestamp"].is_i64());
    }
}
