//! Shared harness: the real router on an ephemeral port.
#![allow(dead_code)]

use cafe_auth::TokenType;
use cafe_core::{Cafe, Id, Role};
use cafe_server::{AppConfig, AppState, build_app};
use cafe_storage::{NewRating, NewUser};
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub async fn start_server() -> TestServer {
    start_server_with(AppConfig::default()).await
}

pub async fn start_server_with(cfg: AppConfig) -> TestServer {
    let state = AppState::from_config(&cfg).await.expect("build state");
    let app = build_app(state.clone(), &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        state,
        shutdown: tx,
        handle,
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Creates a user directly in storage and returns an access token for it.
    pub async fn token_for(&self, username: &str, role: Role) -> String {
        let user = self
            .state
            .storage
            .create_user(NewUser {
                username: username.into(),
                email: None,
                password_hash: "not-a-real-hash".into(),
                role,
            })
            .await
            .expect("create user");
        self.state
            .tokens
            .issue(&user, TokenType::Access)
            .expect("issue token")
    }

    pub async fn cafe(&self, city: &str, name: &str) -> Option<Cafe> {
        self.state.storage.find_cafe(city, name).await.unwrap()
    }

    /// Adds a rating straight to storage; ratings have no HTTP write path.
    pub async fn rate(&self, cafe_id: Id, author_id: Id, score: i32) {
        let category = self
            .state
            .storage
            .get_or_create_category("Coffee")
            .await
            .unwrap();
        self.state
            .storage
            .create_rating(NewRating {
                category_id: category.id,
                author_id,
                cafe_id,
                icon: "star".into(),
                rating: score,
            })
            .await
            .unwrap();
    }

    pub async fn user_id(&self, username: &str) -> Id {
        self.state
            .storage
            .find_user_by_username(username)
            .await
            .unwrap()
            .expect("user exists")
            .id
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}
