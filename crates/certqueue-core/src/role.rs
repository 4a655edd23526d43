//! Role settings.
//!
//! Roles are owned by the host's configuration endpoints and stored as JSON
//! under `role/<name>`. Only the fields the import subsystem reads are
//! modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::storage::{Storage, StorageEntry};

/// Storage prefix of role definitions.
pub const ROLE_PREFIX: &str = "role/";

/// A role definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Argv template of the external import handler. Empty disables it.
    #[serde(default)]
    pub external_cmd: Vec<String>,
}

impl Role {
    pub fn with_external_cmd<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            external_cmd: cmd.into_iter().map(Into::into).collect(),
        }
    }
}

fn role_key(name: &str) -> String {
    format!("{}{}", ROLE_PREFIX, name)
}

/// Fetch a role. Returns `None` when it does not exist.
pub async fn get_role(storage: &dyn Storage, name: &str) -> CoreResult<Option<Role>> {
    let Some(entry) = storage.get(&role_key(name)).await? else {
        return Ok(None);
    };
    let role = serde_json::from_slice(&entry.value).map_err(|source| CoreError::RoleDecode {
        name: name.to_string(),
        source,
    })?;
    Ok(Some(role))
}

/// List configured role names.
pub async fn list_roles(storage: &dyn Storage) -> CoreResult<Vec<String>> {
    let names = storage.list(ROLE_PREFIX).await?;
    Ok(names.into_iter().filter(|n| !n.ends_with('/')).collect())
}

/// Create or replace a role.
pub async fn put_role(storage: &dyn Storage, name: &str, role: &Role) -> CoreResult<()> {
    let value = serde_json::to_vec(role)?;
    storage.put(StorageEntry::new(role_key(name), value)).await
}

/// Remove a role.
pub async fn delete_role(storage: &dyn Storage, name: &str) -> CoreResult<()> {
    storage.delete(&role_key(name)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_put_get_role() {
        let storage = MemoryStorage::new();
        let role = Role::with_external_cmd(["/bin/handle", "CERTFILE"]);
        put_role(&storage, "web", &role).await.unwrap();

        let loaded = get_role(&storage, "web").await.unwrap().unwrap();
        assert_eq!(loaded, role);
    }

    #[tokio::test]
    async fn test_get_missing_role() {
        let storage = MemoryStorage::new();
        assert!(get_role(&storage, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_ignores_unknown_fields() {
        let storage = MemoryStorage::new();
        storage
            .put(StorageEntry::new(
                "role/web",
                br#"{"ttl": 3600, "allow_any_name": true}"#.to_vec(),
            ))
            .await
            .unwrap();

        let role = get_role(&storage, "web").await.unwrap().unwrap();
        assert!(role.external_cmd.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_role() {
        let storage = MemoryStorage::new();
        storage
            .put(StorageEntry::new("role/web", b"not json".to_vec()))
            .await
            .unwrap();

        let result = get_role(&storage, "web").await;
        assert!(matches!(result, Err(CoreError::RoleDecode { .. })));
    }

    #[tokio::test]
    async fn test_list_and_delete_roles() {
        let storage = MemoryStorage::new();
        put_role(&storage, "web", &Role::default()).await.unwrap();
        put_role(&storage, "mail", &Role::default()).await.unwrap();

        assert_eq!(list_roles(&storage).await.unwrap(), vec!["mail", "web"]);

        delete_role(&storage, "mail").await.unwrap();
        assert_eq!(list_roles(&storage).await.unwrap(), vec!["web"]);
    }
}
