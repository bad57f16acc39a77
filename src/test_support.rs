//! Shared fixtures for unit and HTTP tests

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::Extension,
    http::{header, HeaderMap, Method, Request, Response, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::auth::models::{AuthError, Claims};
use crate::auth::verifier::IdentityVerifier;
use crate::auth::SessionManager;
use crate::common::config::{FirebaseCredentials, NodeEnv};
use crate::common::migrations::run_migrations;
use crate::common::{AppState, ClientEnv, SharedState};
use crate::services::google::{GoogleEndpoints, GoogleService};
use crate::users::sqlite::SqliteDocumentStore;
use crate::users::UserStore;

/// 2048-bit RSA key used to sign test ID tokens and service-account assertions
pub const TEST_KEY_PEM: &str = include_str!("testdata/signing_key.pem");

/// Base64url modulus of `TEST_KEY_PEM`; the exponent is `AQAB`
pub const TEST_KEY_N: &str = "wMaXBzHEhljR4vbVj91UpsTzymMKRqKPxYIrb62bDr34BpMgt9CDuHHmQaGGegVfORkNAJ04G-ClVAVXM8WOo2qXtxHgJUwVClyVxMUts1UFCtFrYXn56MCfj5SdF4NsrnGEHRU0Zfb0ws-3xDx3uxycDLlJ860rWVP5xa86wIRh8qiNrPyVWS8gQ5zNck99OU68fz-U9HS4k8tr8D4Ona9CRnUQ9y6zZ9bmF4NNozi11EPzI6oETGYTKxw1GUIDJBJv_gc5ay2-rfxx5mQHlNUXk-JQMSlAdeShzxGdo31gpd0xKFPEJOjTx6WkZr2ni4aazWNKazhGjFbwdXWksQ";

pub const TEST_KID: &str = "test-kid";
pub const TEST_PROJECT: &str = "demo-project";
pub const TEST_SESSION_SECRET: &str = "test-session-secret";

/// Claims of a test ID token; fields are public so tests can corrupt them.
#[derive(Debug, Clone, Serialize)]
pub struct IdTokenSpec {
    #[serde(skip)]
    pub kid: String,
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: i64,
    pub email: String,
    pub name: String,
    pub picture: String,
}

impl IdTokenSpec {
    pub fn new(sub: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            kid: TEST_KID.to_string(),
            iss: format!("https://securetoken.google.com/{}", TEST_PROJECT),
            aud: TEST_PROJECT.to_string(),
            sub: sub.to_string(),
            iat: now - 10,
            exp: now + 3600,
            auth_time: now - 10,
            email: format!("{}@example.com", sub),
            name: "Test User".to_string(),
            picture: "https://lh3.googleusercontent.com/a/test.png".to_string(),
        }
    }
}

pub fn sign_id_token(spec: &IdTokenSpec) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(spec.kid.clone());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
    encode(&header, spec, &key).unwrap()
}

/// Provider-side identity for `uid` with predictable fields
pub fn claims(uid: &str) -> Claims {
    Claims {
        uid: uid.to_string(),
        email: Some(format!("{}@example.com", uid)),
        display_name: Some(format!("User {}", uid)),
        photo_url: Some(format!("https://lh3.googleusercontent.com/a/{}.png", uid)),
    }
}

/// In-memory identity provider keyed by opaque token strings
#[derive(Default)]
pub struct FakeIdentityVerifier {
    tokens: HashMap<String, Claims>,
    missing_accounts: HashSet<String>,
}

impl FakeIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, claims: Claims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }

    /// Token verifies, but the admin lookup for `uid` fails.
    pub fn without_account(mut self, uid: &str) -> Self {
        self.missing_accounts.insert(uid.to_string());
        self
    }
}

#[async_trait]
impl IdentityVerifier for FakeIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }

    async fn get_user(&self, uid: &str) -> Result<Claims, AuthError> {
        if self.missing_accounts.contains(uid) {
            return Err(AuthError::ProviderUnavailable(format!("no account {}", uid)));
        }
        self.tokens
            .values()
            .find(|c| c.uid == uid)
            .cloned()
            .ok_or_else(|| AuthError::ProviderUnavailable(format!("no account {}", uid)))
    }
}

/// Migrated in-memory document store.
///
/// One connection, because every `sqlite::memory:` connection is its own
/// database.
pub async fn sqlite_documents() -> Arc<SqliteDocumentStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool, false).await.unwrap();
    Arc::new(SqliteDocumentStore::new(pool))
}

pub fn client_env() -> ClientEnv {
    ClientEnv {
        mode: NodeEnv::Test,
        allow_indexing: None,
    }
}

/// App state over an in-memory store and the given identity provider
pub async fn test_state(identity: FakeIdentityVerifier) -> SharedState {
    Arc::new(AppState {
        identity: Arc::new(identity),
        users: UserStore::new(sqlite_documents().await),
        sessions: SessionManager::new(TEST_SESSION_SECRET, false).unwrap(),
        client_env: client_env(),
    })
}

/// `Cookie` header value carrying a session for `user_id`
pub fn session_cookie(state: &AppState, user_id: &str) -> String {
    let mut session = state.sessions.new_session();
    session.set_user_id(user_id);
    let set_cookie = state.sessions.commit_session(&session).unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

pub fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A request as received by `StubServer`
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path exactly as sent, still percent-encoded
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Local HTTP server standing in for the Google APIs.
///
/// Answers canned responses keyed by method and raw path; anything else is a
/// Firestore-style 404. `POST /token` always hands out `stub-token`.
#[derive(Clone, Default)]
pub struct StubServer {
    routes: Arc<Mutex<HashMap<(String, String), (StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn new() -> Self {
        let stub = Self::default();
        stub.respond(
            Method::POST,
            "/token",
            StatusCode::OK,
            json!({ "access_token": "stub-token", "token_type": "Bearer", "expires_in": 3600 }),
        );
        stub
    }

    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body));
    }

    /// Requests seen so far, excluding token exchanges
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path != "/token")
            .cloned()
            .collect()
    }

    /// Bind to an ephemeral port and return the base URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new()
            .fallback(stub_handler)
            .layer(Extension(self.clone()));

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn stub_handler(
    Extension(stub): Extension<StubServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    let path = uri.path().to_string();
    stub.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let canned = stub
        .routes
        .lock()
        .unwrap()
        .get(&(method.to_string(), path))
        .cloned();

    match canned {
        Some((status, body)) => (status, axum::Json(body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": { "code": 404, "status": "NOT_FOUND" } })),
        )
            .into_response(),
    }
}

/// Every Google API rooted under `base`
pub fn stub_endpoints(base: &str) -> GoogleEndpoints {
    GoogleEndpoints {
        token_uri: format!("{}/token", base),
        jwks_uri: format!("{}/jwks", base),
        identity_toolkit_base: format!("{}/identitytoolkit/v1", base),
        firestore_base: format!("{}/firestore/v1", base),
    }
}

/// Service-account client for `TEST_PROJECT` talking to a stub at `base`
pub fn stub_google(base: &str) -> Arc<GoogleService> {
    let credentials = FirebaseCredentials {
        project_id: TEST_PROJECT.to_string(),
        client_email: format!("svc@{}.iam.gserviceaccount.com", TEST_PROJECT),
        private_key: TEST_KEY_PEM.to_string(),
    };
    let http = Client::builder().no_proxy().build().unwrap();
    Arc::new(
        GoogleService::new(http, &credentials)
            .unwrap()
            .with_endpoints(stub_endpoints(base)),
    )
}

/// JWKS document publishing the test key under `TEST_KID`
pub fn test_jwks() -> Value {
    json!({
        "keys": [{
            "kid": TEST_KID,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": TEST_KEY_N,
            "e": "AQAB"
        }]
    })
}
