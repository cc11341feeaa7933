//! JSON file-backed destination store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{Destination, Profile, RecentSend},
    errors::Error,
    ports::DestinationStore,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct StoreLimits {
    pub recency_retain: usize,
    pub recent_sends_max: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            recency_retain: 10,
            recent_sends_max: 50,
        }
    }
}

/// On-disk layout of the store file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_profile_id: Option<String>,
    #[serde(default)]
    pub recency: Vec<String>,
    #[serde(default)]
    pub recent_sends: Vec<RecentSend>,
}

impl StoreData {
    /// The active profile, falling back to the first one.
    pub fn active_profile(&self) -> Option<&Profile> {
        match &self.active_profile_id {
            Some(id) => self.profiles.iter().find(|p| &p.id == id),
            None => self.profiles.first(),
        }
    }
}

/// Move `id` to the front, dropping duplicates and anything past `retain`.
pub fn push_recency(list: &mut Vec<String>, id: &str, retain: usize) {
    list.retain(|x| x != id);
    list.insert(0, id.to_string());
    list.truncate(retain);
}

pub struct JsonFileStore {
    path: PathBuf,
    limits: StoreLimits,
    state: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>, limits: StoreLimits) -> Result<Self> {
        let path = path.into();
        let data = load_store_file(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            limits,
            state: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace all profiles with the extension's copy (dashboard edits).
    ///
    /// Recency entries pointing at destinations that no longer exist in any
    /// profile are dropped.
    pub async fn replace_profiles(
        &self,
        profiles: Vec<Profile>,
        active_profile_id: Option<String>,
    ) -> Result<()> {
        if let Some(id) = &active_profile_id {
            if !profiles.iter().any(|p| &p.id == id) {
                return Err(Error::NotFound(format!("profile {id}")));
            }
        }

        let mut st = self.state.lock().await;
        st.profiles = profiles;
        st.active_profile_id = active_profile_id;
        let known: Vec<String> = st
            .profiles
            .iter()
            .flat_map(|p| p.destinations.iter().map(|d| d.id.clone()))
            .collect();
        st.recency.retain(|id| known.contains(id));
        save_store_file(&self.path, &st)
    }

    async fn mutate(&self, f: impl FnOnce(&mut StoreData) -> Result<()> + Send) -> Result<()> {
        let mut st = self.state.lock().await;
        let mut next = st.clone();
        f(&mut next)?;
        save_store_file(&self.path, &next)?;
        *st = next;
        Ok(())
    }
}

#[async_trait]
impl DestinationStore for JsonFileStore {
    async fn active_profile(&self) -> Result<Option<Profile>> {
        Ok(self.state.lock().await.active_profile().cloned())
    }

    async fn update_destinations(
        &self,
        profile_id: &str,
        destinations: Vec<Destination>,
    ) -> Result<()> {
        self.mutate(|st| {
            let profile = st
                .profiles
                .iter_mut()
                .find(|p| p.id == profile_id)
                .ok_or_else(|| Error::NotFound(format!("profile {profile_id}")))?;
            profile.destinations = destinations;
            Ok(())
        })
        .await
    }

    async fn recency(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().await.recency.clone())
    }

    async fn push_recency(&self, destination_id: &str) -> Result<()> {
        let retain = self.limits.recency_retain;
        self.mutate(|st| {
            push_recency(&mut st.recency, destination_id, retain);
            Ok(())
        })
        .await
    }

    async fn push_recent_send(&self, entry: RecentSend) -> Result<()> {
        let max = self.limits.recent_sends_max;
        self.mutate(|st| {
            st.recent_sends.insert(0, entry);
            st.recent_sends.truncate(max);
            Ok(())
        })
        .await
    }

    async fn recent_sends(&self) -> Result<Vec<RecentSend>> {
        Ok(self.state.lock().await.recent_sends.clone())
    }
}

fn load_store_file(path: &Path) -> Result<Option<StoreData>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = std::fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let data: StoreData = serde_json::from_str(&txt)?;
    Ok(Some(data))
}

fn save_store_file(path: &Path, data: &StoreData) -> Result<()> {
    let txt = serde_json::to_string_pretty(data)?;
    // Write-then-rename so a crash never leaves a truncated store behind.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, txt)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
