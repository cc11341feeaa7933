use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    menu::{
        adapter::{apply, ApplyReport},
        builder::{build_menu, is_on_origin, MenuInput, MenuOptions},
    },
    ports::{DestinationStore, MenuRegistrar},
    Result,
};

/// Owns the inputs of a rebuild that do not live in the store.
pub struct MenuService {
    store: Arc<dyn DestinationStore>,
    registrar: Arc<dyn MenuRegistrar>,
    options: MenuOptions,
    active_tab_url: Mutex<Option<String>>,
    /// Held for a whole clear-and-recreate so two rebuilds never interleave.
    rebuilding: Mutex<()>,
}

impl MenuService {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        registrar: Arc<dyn MenuRegistrar>,
        options: MenuOptions,
    ) -> Self {
        Self {
            store,
            registrar,
            options,
            active_tab_url: Mutex::new(None),
            rebuilding: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &MenuOptions {
        &self.options
    }

    /// Regenerate and apply the whole menu from current state.
    pub async fn rebuild(&self) -> Result<ApplyReport> {
        let _guard = self.rebuilding.lock().await;
        let profile = self.store.active_profile().await?;
        let recency = self.store.recency().await?;
        let tab_url = self.active_tab_url.lock().await.clone();

        let commands = build_menu(&MenuInput {
            profile: profile.as_ref(),
            recency: &recency,
            active_tab_url: tab_url.as_deref(),
            options: &self.options,
        });
        let report = apply(self.registrar.as_ref(), commands).await;
        tracing::debug!(created = report.created, failed = report.failed, "menu rebuilt");
        Ok(report)
    }

    /// Same as [`rebuild`](Self::rebuild) but only logs failures.
    pub async fn refresh(&self) {
        if let Err(e) = self.rebuild().await {
            tracing::warn!(error = %e, "menu rebuild failed");
        }
    }

    /// Record the active tab. Returns true when the Telegram Web gate flipped,
    /// in which case the caller owes a rebuild.
    pub async fn record_active_tab(&self, url: Option<String>) -> bool {
        let mut current = self.active_tab_url.lock().await;
        let was = self.is_telegram_web(current.as_deref());
        let now = self.is_telegram_web(url.as_deref());
        *current = url;
        was != now
    }

    pub fn is_telegram_web(&self, url: Option<&str>) -> bool {
        url.is_some_and(|u| is_on_origin(u, &self.options.telegram_web_origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Destination, Profile, RecentSend},
        menu::MenuNode,
    };
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct StaticStore(Option<Profile>);

    #[async_trait]
    impl DestinationStore for StaticStore {
        async fn active_profile(&self) -> Result<Option<Profile>> {
            Ok(self.0.clone())
        }
        async fn update_destinations(&self, _: &str, _: Vec<Destination>) -> Result<()> {
            Ok(())
        }
        async fn recency(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
        async fn push_recency(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn push_recent_send(&self, _: RecentSend) -> Result<()> {
            Ok(())
        }
        async fn recent_sends(&self) -> Result<Vec<RecentSend>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct CountingRegistrar {
        clears: StdMutex<usize>,
        titles: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl MenuRegistrar for CountingRegistrar {
        async fn clear(&self) -> Result<()> {
            *self.clears.lock().unwrap() += 1;
            self.titles.lock().unwrap().clear();
            Ok(())
        }
        async fn create(&self, node: &MenuNode) -> Result<()> {
            self.titles.lock().unwrap().push(node.title.clone());
            Ok(())
        }
    }

    fn service(reg: Arc<CountingRegistrar>) -> MenuService {
        let profile = Profile {
            id: "p".to_string(),
            name: "p".to_string(),
            bot_token: "t".to_string(),
            ..Profile::default()
        };
        MenuService::new(
            Arc::new(StaticStore(Some(profile))),
            reg,
            MenuOptions::default(),
        )
    }

    #[tokio::test]
    async fn tab_changes_flip_the_gate_only_across_the_origin() {
        let reg = Arc::new(CountingRegistrar::default());
        let svc = service(reg.clone());

        assert!(!svc.record_active_tab(Some("https://example.com".to_string())).await);
        assert!(
            svc.record_active_tab(Some("https://web.telegram.org/k/#-100111".to_string()))
                .await
        );
        svc.refresh().await;
        assert_eq!(*reg.clears.lock().unwrap(), 1);
        assert!(reg
            .titles
            .lock()
            .unwrap()
            .iter()
            .any(|t| t == "➕ Add to SwiftShift"));

        assert!(
            !svc.record_active_tab(Some("https://web.telegram.org/a/#42".to_string()))
                .await
        );
        assert!(
            svc.record_active_tab(Some("https://web.telegram.org.evil.example/#42".to_string()))
                .await
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rebuilds_do_not_interleave() {
        let reg = Arc::new(CountingRegistrar::default());
        let svc = Arc::new(service(reg.clone()));
        svc.refresh().await;
        let single = reg.titles.lock().unwrap().len();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.refresh().await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(*reg.clears.lock().unwrap(), 9);
        assert_eq!(reg.titles.lock().unwrap().len(), single);
    }
}
