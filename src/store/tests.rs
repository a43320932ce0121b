//! Store Module Tests
//!
//! ## Test Scopes
//! - **MemoryStore**: Put/Get/Delete semantics and collection isolation.
//! - **HttpStore**: Request shape, status mapping and auth handling, verified
//!   against an in-process axum server that emulates the remote REST API.

#[cfg(test)]
mod tests {
    use crate::store::{HttpStore, MemoryStore, RemoteError, RemoteStore};
    use axum::{
        Extension, Router,
        body::Bytes,
        extract::Path,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        routing::get,
    };
    use std::sync::Arc;
    use std::time::Duration;

    // basic auth for user "test-key" with an empty password
    const EXPECTED_AUTH: &str = "Basic dGVzdC1rZXk6";

    // ============================================================
    // MEMORY STORE
    // ============================================================

    #[tokio::test]
    async fn test_memory_store_put_get_delete() {
        let store = MemoryStore::new();

        store.put("Sessions", "alice", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get("Sessions", "alice").await.unwrap(), b"{}");

        store.delete("Sessions", "alice").await.unwrap();
        assert_eq!(
            store.get("Sessions", "alice").await,
            Err(RemoteError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_memory_store_collections_are_isolated() {
        let store = MemoryStore::new();

        store.put("Sessions", "k", b"1".to_vec()).await.unwrap();
        store.put("Users", "k", b"2".to_vec()).await.unwrap();

        assert_eq!(store.get("Sessions", "k").await.unwrap(), b"1");
        assert_eq!(store.get("Users", "k").await.unwrap(), b"2");
        assert_eq!(store.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_delete_missing_is_ok() {
        let store = MemoryStore::new();

        assert!(store.delete("Nothing", "here").await.is_ok());
    }

    // ============================================================
    // HTTP STORE (against an emulated remote service)
    // ============================================================

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(EXPECTED_AUTH)
    }

    async fn emu_get(
        Extension(store): Extension<Arc<MemoryStore>>,
        headers: HeaderMap,
        Path((collection, key)): Path<(String, String)>,
    ) -> Result<Vec<u8>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        store.raw(&collection, &key).ok_or(StatusCode::NOT_FOUND)
    }

    async fn emu_put(
        Extension(store): Extension<Arc<MemoryStore>>,
        headers: HeaderMap,
        Path((collection, key)): Path<(String, String)>,
        body: Bytes,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        store.put(&collection, &key, body.to_vec()).await.unwrap();
        StatusCode::CREATED
    }

    async fn emu_delete(
        Extension(store): Extension<Arc<MemoryStore>>,
        headers: HeaderMap,
        Path((collection, key)): Path<(String, String)>,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        if !store.contains(&collection, &key) {
            return StatusCode::NOT_FOUND;
        }
        store.delete(&collection, &key).await.unwrap();
        StatusCode::NO_CONTENT
    }

    async fn spawn_emulator() -> (String, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        let app = Router::new()
            .route(
                "/v0/:collection/:key",
                get(emu_get).put(emu_put).delete(emu_delete),
            )
            .layer(Extension(backing.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), backing)
    }

    #[tokio::test]
    async fn test_http_store_roundtrip() {
        // ARRANGE
        let (url, backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "test-key", Duration::from_secs(2)).unwrap();

        // ACT
        store
            .put("Sessions", "alice", br#"{"state":0}"#.to_vec())
            .await
            .unwrap();
        let fetched = store.get("Sessions", "alice").await.unwrap();

        // ASSERT
        assert_eq!(fetched, br#"{"state":0}"#);
        assert!(backing.contains("Sessions", "alice"));
    }

    #[tokio::test]
    async fn test_http_store_missing_key_is_not_found() {
        let (url, _backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "test-key", Duration::from_secs(2)).unwrap();

        let result = store.get("Sessions", "ghost").await;

        assert_eq!(result, Err(RemoteError::NotFound));
    }

    #[tokio::test]
    async fn test_http_store_delete_removes_and_tolerates_missing() {
        let (url, backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "test-key", Duration::from_secs(2)).unwrap();

        store.put("Users", "bob", b"{}".to_vec()).await.unwrap();
        store.delete("Users", "bob").await.unwrap();

        assert!(!backing.contains("Users", "bob"));
        assert!(store.delete("Users", "bob").await.is_ok());
    }

    #[tokio::test]
    async fn test_http_store_escapes_keys() {
        let (url, backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "test-key", Duration::from_secs(2)).unwrap();

        store
            .put("Sessions", "room 7?x=1", b"{}".to_vec())
            .await
            .unwrap();

        assert!(backing.contains("Sessions", "room 7?x=1"));
    }

    #[test]
    fn test_http_store_url_keeps_key_segment() {
        let store =
            HttpStore::new("https://api.orchestrate.io", "k", Duration::from_secs(1)).unwrap();

        let url = store.url("Sessions", "a/b").unwrap();

        assert_eq!(url.as_str(), "https://api.orchestrate.io/v0/Sessions/a%2Fb");
    }

    #[tokio::test]
    async fn test_http_store_refuses_dot_segments() {
        // ARRANGE
        let (url, backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "test-key", Duration::from_secs(2)).unwrap();
        store.put("Sessions", "keep", b"{}".to_vec()).await.unwrap();

        // ACT + ASSERT: never collapses onto the collection URL
        for key in [".", ".."] {
            assert!(matches!(
                store.url("Sessions", key),
                Err(RemoteError::Transport(_))
            ));
            assert!(matches!(
                store.delete("Sessions", key).await,
                Err(RemoteError::Transport(_))
            ));
            assert!(matches!(
                store.put("Sessions", key, b"{}".to_vec()).await,
                Err(RemoteError::Transport(_))
            ));
        }
        assert!(backing.contains("Sessions", "keep"));
        assert_eq!(backing.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_http_store_bad_key_is_unauthorized_and_fatal() {
        let (url, _backing) = spawn_emulator().await;
        let store = HttpStore::new(&url, "wrong-key", Duration::from_secs(2)).unwrap();

        let err = store.get("Sessions", "alice").await.unwrap_err();

        assert!(matches!(err, RemoteError::Unauthorized(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_http_store_unreachable_is_transport_error() {
        // Bind then drop to obtain a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpStore::new(
            &format!("http://{}", addr),
            "test-key",
            Duration::from_millis(500),
        )
        .unwrap();

        let err = store.get("Sessions", "alice").await.unwrap_err();

        assert!(matches!(err, RemoteError::Transport(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_http_store_rejects_invalid_url() {
        assert!(HttpStore::new("not a url", "k", Duration::from_secs(1)).is_err());
    }
}
