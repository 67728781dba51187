use pwa_core::{ConfigSnapshot, Error, Generation, Request, Response};
use url::Url;

/// Cached offline page and offline image lookups.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    generation: Generation,
    page_url: Url,
    image_url: Url,
}

impl OfflineFallback {
    pub fn new(snapshot: &ConfigSnapshot, generation: Generation) -> Self {
        Self { generation, page_url: snapshot.offline_page_url.clone(), image_url: snapshot.offline_image_url.clone() }
    }

    pub async fn page(&self) -> Result<Response, Error> {
        self.lookup(&self.page_url).await
    }

    pub async fn image(&self) -> Result<Response, Error> {
        self.lookup(&self.image_url).await
    }

    async fn lookup(&self, url: &Url) -> Result<Response, Error> {
        self.generation
            .lookup(&Request::get(url.clone()))
            .await?
            .ok_or_else(|| Error::OfflineUnavailable(format!("{url} not cached in {}", self.generation.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwa_core::{AppConfig, CacheDb, CacheStore, Headers, ResponseKind};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_offline_lookups() {
        let snapshot = AppConfig { origin: "https://example.com".into(), ..Default::default() }.snapshot().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let generation = Generation::open(store, snapshot.current_generation()).await.unwrap();
        let offline = OfflineFallback::new(&snapshot, generation.clone());

        assert!(matches!(offline.page().await, Err(Error::OfflineUnavailable(_))));

        let req = Request::get(snapshot.offline_page_url.clone());
        let page = Response::new(req.url.clone(), 200, Headers::new(), "<h1>Offline</h1>", ResponseKind::Basic);
        generation.put(&req, &page).await.unwrap();

        assert_eq!(offline.page().await.unwrap().body.as_ref(), b"<h1>Offline</h1>");
        assert!(offline.image().await.is_err());
    }
}
