//! Integration tests for Marketstall.
//!
//! Each test serves the real router on an ephemeral port, backed by the
//! in-memory repositories and asset store, and talks to it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Register, login, token checks
//! - `catalog` - Catalog CRUD, slugs, pagination, admin gate
//! - `cart` - Cart lifecycle and totals

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use marketstall_api::app;
use marketstall_api::assets::MemoryAssetStore;
use marketstall_api::config::{ApiConfig, JwtSettings};
use marketstall_api::db::Repositories;
use marketstall_api::services::auth::create_account;
use marketstall_api::state::AppState;
use marketstall_core::Role;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

pub const ADMIN_EMAIL: &str = "admin@shop.test";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

/// A running API plus an HTTP client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
}

fn test_config() -> ApiConfig {
    let base_url = Url::parse("http://127.0.0.1:5000").expect("valid base url");
    ApiConfig {
        database_url: SecretString::from("postgres://unused@localhost/unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        upload_dir: std::env::temp_dir().join("marketstall-integration-uploads"),
        cors_origins: vec!["http://localhost:3000".to_string()],
        jwt: JwtSettings {
            secret: SecretString::from("q7Lm$2vXp9@Rt4#Kz8!Wn3^Hb6&Jc1*F"),
            ttl_minutes: 60,
            issuer: base_url.origin().ascii_serialization(),
        },
        base_url,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestContext {
    /// Serve a fresh, empty API.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    pub async fn new() -> Self {
        let state = AppState::with_repositories(
            test_config(),
            Repositories::memory(),
            Arc::new(MemoryAssetStore::default()),
        );

        let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            state,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    #[must_use]
    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Register a shopper and return their token.
    ///
    /// # Panics
    ///
    /// Panics unless registration succeeds.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let resp = self
            .post("/api/auth/register")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status(), StatusCode::CREATED);
        token_of(&json_body(resp).await)
    }

    /// Log in and return the token.
    ///
    /// # Panics
    ///
    /// Panics unless login succeeds.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), StatusCode::OK);
        token_of(&json_body(resp).await)
    }

    /// Provision an admin the way the CLI does, then log in.
    ///
    /// # Panics
    ///
    /// Panics if the account cannot be created.
    pub async fn admin_token(&self) -> String {
        create_account(self.state.users(), ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)
            .await
            .expect("create admin");
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create a product as admin and return its JSON.
    ///
    /// # Panics
    ///
    /// Panics unless the API answers 201.
    pub async fn create_product(&self, token: &str, form: Form) -> Value {
        let resp = self
            .post("/api/product")
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("create product request");
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await["data"].clone()
    }
}

fn token_of(body: &Value) -> String {
    body["data"]["token"]
        .as_str()
        .expect("token in session body")
        .to_string()
}

/// Parse a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("JSON response body")
}

/// A small PNG-typed image part.
///
/// # Panics
///
/// Never in practice; `image/png` is a valid mime type.
#[must_use]
pub fn image_part(file_name: &str) -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\nfake".to_vec())
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .expect("valid mime type")
}

/// Product form with every required field and an image.
#[must_use]
pub fn product_form(title: &str, price: &str, sizes: &str) -> Form {
    Form::new()
        .text("title", title.to_string())
        .text("price", price.to_string())
        .text("sizes", sizes.to_string())
        .text("description", format!("{title} description"))
        .part("image", image_part("shirt.png"))
}

/// Banner form for the trending and most-sales kinds.
#[must_use]
pub fn banner_form(heading: &str) -> Form {
    Form::new()
        .text("heading", heading.to_string())
        .text("subheading", "Limited time")
        .text("btnText", "Shop now")
        .part("image", image_part("banner.jpg"))
}
