//! Cancellable catalog fetch.
//!
//! At most one fetch is in flight. Starting another aborts the previous one,
//! and dropping the fetcher aborts whatever is still running.

use super::{CatalogError, CatalogSource, KnownSolids};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct CatalogFetcher {
    source: Arc<dyn CatalogSource>,
    in_flight: Option<(String, JoinHandle<Result<KnownSolids, CatalogError>>)>,
}

impl CatalogFetcher {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        CatalogFetcher {
            source,
            in_flight: None,
        }
    }

    /// Begin fetching `key`, aborting any fetch already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, key: &str) {
        self.abort();
        let source = Arc::clone(&self.source);
        let owned = key.to_string();
        let handle = tokio::spawn(async move { source.fetch(&owned).await });
        tracing::debug!(key, "catalog fetch started");
        self.in_flight = Some((key.to_string(), handle));
    }

    /// Key of the fetch in flight, if any.
    pub fn pending(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|(k, _)| k.as_str())
    }

    /// Abort the fetch in flight. Returns true if there was one.
    pub fn abort(&mut self) -> bool {
        match self.in_flight.take() {
            Some((key, handle)) => {
                handle.abort();
                tracing::debug!(key = %key, "catalog fetch aborted");
                true
            }
            None => false,
        }
    }

    /// Wait for the fetch in flight.
    pub async fn finish(&mut self) -> Result<KnownSolids, CatalogError> {
        let Some((_, handle)) = self.in_flight.take() else {
            return Err(CatalogError::Idle);
        };
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CatalogError::Aborted),
            Err(e) => Err(CatalogError::Task(e.to_string())),
        }
    }
}

impl Drop for CatalogFetcher {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers "slow" only after a long sleep, everything else immediately.
    struct Scripted {
        completed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CatalogSource for Scripted {
        async fn fetch(&self, key: &str) -> Result<KnownSolids, CatalogError> {
            if key == "slow" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            let mut solids = KnownSolids::new();
            solids.insert(key.to_string(), 1.0);
            Ok(solids)
        }
    }

    fn fetcher() -> (CatalogFetcher, Arc<AtomicUsize>) {
        let completed = Arc::new(AtomicUsize::new(0));
        let source = Scripted {
            completed: Arc::clone(&completed),
        };
        (CatalogFetcher::new(Arc::new(source)), completed)
    }

    #[tokio::test]
    async fn test_finish_returns_result() {
        let (mut f, _) = fetcher();
        f.start("fast");
        assert_eq!(f.pending(), Some("fast"));
        let solids = f.finish().await.unwrap();
        assert!(solids.contains_key("fast"));
        assert_eq!(f.pending(), None);
    }

    #[tokio::test]
    async fn test_restart_aborts_previous() {
        let (mut f, completed) = fetcher();
        f.start("slow");
        f.start("fast");
        let solids = f.finish().await.unwrap();
        assert!(solids.contains_key("fast"));
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort() {
        let (mut f, _) = fetcher();
        f.start("slow");
        assert!(f.abort());
        assert!(!f.abort());
        assert!(matches!(f.finish().await, Err(CatalogError::Idle)));
    }

    #[tokio::test]
    async fn test_idle_finish() {
        let (mut f, _) = fetcher();
        assert!(matches!(f.finish().await, Err(CatalogError::Idle)));
    }

    #[tokio::test]
    async fn test_drop_aborts() {
        let (mut f, completed) = fetcher();
        f.start("slow");
        drop(f);
        tokio::task::yield_now().await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }
}
