//! Test doubles: a mock hubs upstream and counting fakes for the three
//! injected clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use common::TokenRecord;
use forge_auth::{AuthFuture, Credentials, SecretSource, TokenIssuer, parse_secret_string};
use token_store::{StoreError, StoreFuture, TokenKey, TokenStore};
use tokio::net::TcpListener;

/// Handle to a spawned mock of `GET /project/v1/hubs`.
pub struct MockHubs {
    pub url: String,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockHubs {
    /// Authorization headers received, in order
    pub fn seen_auth_headers(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Start a mock hubs API answering every request with `status` and `body`.
pub async fn start_hubs_server(status: StatusCode, body: &'static str) -> MockHubs {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorded = seen.clone();
    let app = axum::Router::new().route(
        "/project/v1/hubs",
        get(move |headers: HeaderMap| {
            let recorded = recorded.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                recorded.lock().unwrap().push(auth);
                (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockHubs {
        url: format!("http://{addr}/project/v1/hubs"),
        seen,
    }
}

/// Secret source returning a fixed payload (or "not found").
pub struct FakeSecrets {
    payload: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeSecrets {
    pub fn with_payload(payload: &'static str) -> Self {
        Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretSource for FakeSecrets {
    fn id(&self) -> &str {
        "fake"
    }

    fn fetch_credentials(&self) -> AuthFuture<'_, Credentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.payload {
            Some(payload) => parse_secret_string("test-secret", payload),
            None => Err(forge_auth::Error::SecretNotFound("test-secret".into())),
        };
        Box::pin(async move { result })
    }
}

/// Token issuer returning a fixed record (or a provider rejection).
pub struct FakeIssuer {
    record: Option<TokenRecord>,
    calls: AtomicUsize,
    client_ids: Mutex<Vec<String>>,
}

impl FakeIssuer {
    pub fn issuing(record: TokenRecord) -> Self {
        Self {
            record: Some(record),
            calls: AtomicUsize::new(0),
            client_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            record: None,
            calls: AtomicUsize::new(0),
            client_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.client_ids.lock().unwrap().clone()
    }
}

impl TokenIssuer for FakeIssuer {
    fn issue_token<'a>(&'a self, credentials: &'a Credentials) -> AuthFuture<'a, TokenRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.client_ids
            .lock()
            .unwrap()
            .push(credentials.client_id.clone());
        let result = self.record.clone().ok_or_else(|| {
            forge_auth::Error::AuthProvider(r#"401: {"errorCode":"AUTH-001"}"#.into())
        });
        Box::pin(async move { result })
    }
}

/// Token store recording every call, optionally failing saves or deletes.
#[derive(Default)]
pub struct RecordingStore {
    fail_saves: bool,
    fail_deletes: bool,
    save_calls: AtomicUsize,
    saves: Mutex<Vec<TokenKey>>,
    deletes: Mutex<Vec<TokenKey>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Successfully saved items
    pub fn saves(&self) -> Vec<TokenKey> {
        self.saves.lock().unwrap().clone()
    }

    /// Every delete attempted, successful or not
    pub fn deletes(&self) -> Vec<TokenKey> {
        self.deletes.lock().unwrap().clone()
    }
}

impl TokenStore for RecordingStore {
    fn id(&self) -> &str {
        "recording"
    }

    fn save<'a>(&'a self, record: &'a TokenRecord) -> StoreFuture<'a, ()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_saves {
            Err(StoreError::Write("ProvisionedThroughputExceeded".into()))
        } else {
            self.saves
                .lock()
                .unwrap()
                .push(TokenKey::from_record(record));
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn delete(&self, key: TokenKey) -> StoreFuture<'_, ()> {
        self.deletes.lock().unwrap().push(key);
        let result = if self.fail_deletes {
            Err(StoreError::Delete("ResourceNotFoundException: table".into()))
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}
