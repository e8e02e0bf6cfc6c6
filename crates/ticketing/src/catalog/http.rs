//! HTTP catalog client
//!
//! Talks to the catalog service over JSON. Every request carries the
//! configured timeout; nothing is retried.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use uuid::Uuid;

use super::{CatalogError, CatalogGateway, CatalogResult};
use crate::types::{MenuItem, Vendor};

/// HTTP-based catalog client
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Create a new HTTP catalog client
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn join_ids(ids: &[Uuid]) -> String {
        ids.iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        ids: &[Uuid],
    ) -> CatalogResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", Self::join_ids(ids))])
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::InvalidResponse(format!(
                "{} answered {}",
                path,
                response.status()
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogClient {
    async fn get_vendor(&self, vendor_id: Uuid) -> CatalogResult<Option<Vendor>> {
        let url = format!("{}/api/v1/vendors/{}", self.base_url, vendor_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CatalogError::InvalidResponse(format!(
                "vendor lookup answered {}",
                response.status()
            )));
        }

        response
            .json::<Vendor>()
            .await
            .map(Some)
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))
    }

    async fn get_vendors(&self, vendor_ids: &[Uuid]) -> CatalogResult<Vec<Vendor>> {
        self.get_list("/api/v1/vendors", vendor_ids).await
    }

    async fn get_menu_items(&self, item_ids: &[Uuid]) -> CatalogResult<Vec<MenuItem>> {
        self.get_list("/api/v1/menu-items", item_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn grill(id: Uuid) -> Vendor {
        Vendor {
            id,
            name: "Mama Grill".into(),
            slug: "mama-grill".into(),
            active: true,
        }
    }

    /// Serve `app` on an ephemeral port and return its base URL
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> HttpCatalogClient {
        HttpCatalogClient::new(base_url, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_vendor_lookup_maps_statuses() {
        let known = Uuid::new_v4();
        let broken = Uuid::new_v4();
        let app = Router::new().route(
            "/api/v1/vendors/:vendor_id",
            get(move |Path(id): Path<Uuid>| async move {
                if id == known {
                    Ok(Json(grill(id)))
                } else if id == broken {
                    Err(AxumStatus::INTERNAL_SERVER_ERROR)
                } else {
                    Err(AxumStatus::NOT_FOUND)
                }
            }),
        );
        let catalog = client(&serve(app).await);

        assert_eq!(catalog.get_vendor(known).await.unwrap(), Some(grill(known)));
        assert_eq!(catalog.get_vendor(Uuid::new_v4()).await.unwrap(), None);
        assert!(matches!(
            catalog.get_vendor(broken).await,
            Err(CatalogError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_list_error_status_is_invalid_response() {
        let app = Router::new().route(
            "/api/v1/menu-items",
            get(|| async { AxumStatus::SERVICE_UNAVAILABLE }),
        );
        let catalog = client(&serve(app).await);

        let result = catalog.get_menu_items(&[Uuid::new_v4()]).await;
        assert!(matches!(result, Err(CatalogError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_empty_ids_send_no_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/v1/menu-items",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(Vec::<MenuItem>::new())
                }
            }),
        );
        let catalog = client(&serve(app).await);

        assert!(catalog.get_menu_items(&[]).await.unwrap().is_empty());
        assert!(catalog.get_vendors(&[]).await.unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        catalog.get_menu_items(&[Uuid::new_v4()]).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out() {
        let app = Router::new().route(
            "/api/v1/vendors/:vendor_id",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                AxumStatus::NOT_FOUND
            }),
        );
        let base_url = serve(app).await;
        let catalog = HttpCatalogClient::new(&base_url, Duration::from_millis(100)).unwrap();

        let result = catalog.get_vendor(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_unavailable() {
        let catalog = client("http://127.0.0.1:1");
        let result = catalog.get_vendors(&[Uuid::new_v4()]).await;
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }
}
