use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::snapshot::MetricSnapshot;

/// In-memory store of the latest metric snapshot per dashboard panel.
/// Written by jitter tickers, live-message handlers and REST refreshes.
#[derive(Clone, Default)]
pub struct MetricStore {
    inner: Arc<RwLock<HashMap<String, MetricSnapshot>>>,
}

impl MetricStore {
    /// Create an empty metric store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for a panel. Last write wins.
    pub async fn set(&self, panel: &str, snapshot: MetricSnapshot) {
        let mut g = self.inner.write().await;
        g.insert(panel.to_string(), snapshot);
    }

    /// Fetch the latest snapshot for a panel, if available.
    pub async fn get(&self, panel: &str) -> Option<MetricSnapshot> {
        let g = self.inner.read().await;
        g.get(panel).cloned()
    }

    /// Mutate a panel's snapshot in place, creating an empty one if needed.
    pub async fn update<F, T>(&self, panel: &str, f: F) -> T
    where
        F: FnOnce(&mut MetricSnapshot) -> T,
    {
        let mut g = self.inner.write().await;
        let snap = g.entry(panel.to_string()).or_default();
        f(snap)
    }

    /// Seed a panel only if nothing is stored yet. Returns true if seeded.
    pub async fn seed(&self, panel: &str, snapshot: MetricSnapshot) -> bool {
        let mut g = self.inner.write().await;
        if g.contains_key(panel) {
            return false;
        }
        g.insert(panel.to_string(), snapshot);
        true
    }

    pub async fn remove(&self, panel: &str) -> Option<MetricSnapshot> {
        self.inner.write().await.remove(panel)
    }

    pub async fn panels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_does_not_overwrite() {
        let store = MetricStore::new();
        assert!(store.seed("admin", MetricSnapshot::new().with("x", 1.0)).await);
        assert!(!store.seed("admin", MetricSnapshot::new().with("x", 2.0)).await);
        assert_eq!(store.get("admin").await.unwrap().get("x"), Some(1.0));
    }

    #[tokio::test]
    async fn update_creates_missing_panel() {
        let store = MetricStore::new();
        let n = store
            .update("exec", |s| {
                s.set("riskExposure", 20.0);
                s.len()
            })
            .await;
        assert_eq!(n, 1);
        assert_eq!(store.panels().await, vec!["exec".to_string()]);
        assert!(store.remove("exec").await.is_some());
        assert!(store.get("exec").await.is_none());
    }
}
