//! Persistence façade for encrypted secret records.
//!
//! Only ciphertext ever passes through here; encryption and decryption live
//! in [`crate::vault`], composition in [`crate::credentials`]. All writes are
//! idempotent upserts or deletes, so every operation is safe to retry.

use crate::db::Db;
use std::str::FromStr;
use std::sync::Arc;

/// The closed set of secrets a tenant can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretName {
    /// LLM provider API key used for chat replies.
    LlmApiKey,
    /// Discord bot token used to run the tenant's own bot session.
    BotToken,
}

impl SecretName {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretName::LlmApiKey => "llm_api_key",
            SecretName::BotToken => "bot_token",
        }
    }
}

impl FromStr for SecretName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llm_api_key" => Ok(SecretName::LlmApiKey),
            "bot_token" => Ok(SecretName::BotToken),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct SecretStore {
    db: Arc<Db>,
}

impl SecretStore {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Upsert a ciphertext record. Last write wins; repeated identical
    /// writes are indistinguishable from a single one.
    pub fn put(&self, tenant_id: &str, name: SecretName, ciphertext: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO secrets (tenant_id, secret_name, ciphertext, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (tenant_id, secret_name)
                 DO UPDATE SET ciphertext = excluded.ciphertext, updated_at = excluded.updated_at",
                rusqlite::params![tenant_id, name.as_str(), ciphertext, now],
            )?;
            Ok(())
        })
    }

    /// Fetch the ciphertext for a tenant's secret. Absence is a normal
    /// result, not an error.
    pub fn get(&self, tenant_id: &str, name: SecretName) -> anyhow::Result<Option<String>> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ciphertext FROM secrets WHERE tenant_id = ?1 AND secret_name = ?2",
            )?;
            let mut rows = stmt.query(rusqlite::params![tenant_id, name.as_str()])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get(0)?)),
                None => Ok(None),
            }
        })
    }

    /// Delete a record, reporting whether one existed.
    pub fn delete(&self, tenant_id: &str, name: SecretName) -> anyhow::Result<bool> {
        self.db.with(|conn| {
            let changed = conn.execute(
                "DELETE FROM secrets WHERE tenant_id = ?1 AND secret_name = ?2",
                rusqlite::params![tenant_id, name.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// All tenants holding a secret of the given name. Used by the startup
    /// enumeration path; no ordering guarantee.
    pub fn list_tenants_with(&self, name: SecretName) -> anyhow::Result<Vec<String>> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare("SELECT tenant_id FROM secrets WHERE secret_name = ?1")?;
            let rows = stmt
                .query_map([name.as_str()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::temp_db;

    fn store() -> (tempfile::TempDir, SecretStore) {
        let (dir, db) = temp_db();
        (dir, SecretStore::new(db))
    }

    #[test]
    fn get_absent_returns_none() {
        let (_dir, s) = store();
        assert_eq!(s.get("guild1", SecretName::LlmApiKey).unwrap(), None);
    }

    #[test]
    fn put_then_get_roundtrips() {
        let (_dir, s) = store();
        s.put("guild1", SecretName::LlmApiKey, "ciphertext-a").unwrap();
        assert_eq!(
            s.get("guild1", SecretName::LlmApiKey).unwrap().as_deref(),
            Some("ciphertext-a")
        );
    }

    #[test]
    fn put_is_upsert_last_write_wins() {
        let (_dir, s) = store();
        s.put("guild1", SecretName::LlmApiKey, "old").unwrap();
        s.put("guild1", SecretName::LlmApiKey, "new").unwrap();
        assert_eq!(
            s.get("guild1", SecretName::LlmApiKey).unwrap().as_deref(),
            Some("new")
        );
    }

    #[test]
    fn secret_names_are_independent() {
        let (_dir, s) = store();
        s.put("guild1", SecretName::LlmApiKey, "key-ct").unwrap();
        s.put("guild1", SecretName::BotToken, "token-ct").unwrap();
        assert_eq!(
            s.get("guild1", SecretName::LlmApiKey).unwrap().as_deref(),
            Some("key-ct")
        );
        assert_eq!(
            s.get("guild1", SecretName::BotToken).unwrap().as_deref(),
            Some("token-ct")
        );
        assert!(s.delete("guild1", SecretName::LlmApiKey).unwrap());
        assert_eq!(
            s.get("guild1", SecretName::BotToken).unwrap().as_deref(),
            Some("token-ct")
        );
    }

    #[test]
    fn delete_reports_presence_and_is_idempotent() {
        let (_dir, s) = store();
        s.put("guild1", SecretName::BotToken, "ct").unwrap();
        assert!(s.delete("guild1", SecretName::BotToken).unwrap());
        assert!(!s.delete("guild1", SecretName::BotToken).unwrap());
    }

    #[test]
    fn list_tenants_with_filters_by_name() {
        let (_dir, s) = store();
        s.put("a", SecretName::BotToken, "ct").unwrap();
        s.put("b", SecretName::BotToken, "ct").unwrap();
        s.put("c", SecretName::LlmApiKey, "ct").unwrap();

        let mut tenants = s.list_tenants_with(SecretName::BotToken).unwrap();
        tenants.sort();
        assert_eq!(tenants, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn secret_name_parse_roundtrips() {
        assert_eq!("llm_api_key".parse(), Ok(SecretName::LlmApiKey));
        assert_eq!("bot_token".parse(), Ok(SecretName::BotToken));
        assert!("password".parse::<SecretName>().is_err());
    }
}
