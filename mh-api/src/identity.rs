//! Links between Discord accounts and MouseHunt profiles

use crate::error::StoreError;
use mh_http_client::schema::coerce;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// One Discord account linked to one MouseHunt profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityLink {
    #[serde(deserialize_with = "coerce::number")]
    pub discord_id: u64,
    #[serde(deserialize_with = "coerce::number")]
    pub mousehunt_id: u64,
}

/// Which column a lookup uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey {
    Discord(u64),
    MouseHunt(u64),
}

impl IdentityKey {
    fn matches(self, link: &IdentityLink) -> bool {
        match self {
            IdentityKey::Discord(id) => link.discord_id == id,
            IdentityKey::MouseHunt(id) => link.mousehunt_id == id,
        }
    }
}

/// Identity table, unique on each column
///
/// Backed by a JSON file when a path is given. Writes go to a sibling temp
/// file that is renamed over the store.
#[derive(Debug)]
pub struct IdentityStore {
    path: Option<PathBuf>,
    links: RwLock<Vec<IdentityLink>>,
}

impl IdentityStore {
    /// Store that forgets everything on restart
    pub fn in_memory() -> Self {
        Self {
            path: None,
            links: RwLock::new(Vec::new()),
        }
    }

    /// Open or create the store file
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let links = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                StoreError::DirCreation(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        Ok(Self {
            path: Some(path),
            links: RwLock::new(links),
        })
    }

    /// Add a link; either id already present is a conflict and nothing changes
    pub async fn create(&self, link: IdentityLink) -> Result<IdentityLink, StoreError> {
        let mut links = self.links.write().await;

        if links.iter().any(|l| IdentityKey::Discord(link.discord_id).matches(l)) {
            return Err(StoreError::Conflict {
                field: "discordId",
                id: link.discord_id,
            });
        }
        if links.iter().any(|l| IdentityKey::MouseHunt(link.mousehunt_id).matches(l)) {
            return Err(StoreError::Conflict {
                field: "mousehuntId",
                id: link.mousehunt_id,
            });
        }

        links.push(link);
        if let Err(e) = self.persist(&links).await {
            links.pop();
            return Err(e);
        }

        log::info!(
            "Linked discord {} to mousehunt {}",
            link.discord_id,
            link.mousehunt_id
        );
        Ok(link)
    }

    pub async fn find(&self, key: IdentityKey) -> Option<IdentityLink> {
        self.links
            .read()
            .await
            .iter()
            .find(|link| key.matches(link))
            .copied()
    }

    /// Remove the link for `key`; `Ok(None)` when there was none
    pub async fn delete(&self, key: IdentityKey) -> Result<Option<IdentityLink>, StoreError> {
        let mut links = self.links.write().await;
        let Some(position) = links.iter().position(|link| key.matches(link)) else {
            return Ok(None);
        };

        let removed = links.remove(position);
        if let Err(e) = self.persist(&links).await {
            links.insert(position, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    async fn persist(&self, links: &[IdentityLink]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(links)?;
        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, path).await?;
        Ok(())
    }
}
