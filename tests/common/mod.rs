// tests/common/mod.rs

#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use edurenfort::{
    config::Config,
    routes, seed,
    state::AppState,
    store::{MemoryStore, Store},
};
use reqwest::{Client, Response, multipart};
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "admin@edurenfort.test";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const PASSWORD: &str = "motdepasse";

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn Store>,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// A client that keeps the session cookie between requests.
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build client")
    }

    pub async fn register(&self, client: &Client, email: &str, role: &str) -> Response {
        client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "firstName": "Camille",
                "lastName": "Durand",
                "role": role
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, client: &Client, email: &str, password: &str) -> Response {
        client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn admin(&self) -> Client {
        let client = self.client();
        let res = self.login(&client, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(res.status().as_u16(), 200);
        client
    }

    /// Registers a student and returns their logged-in client and id.
    pub async fn student(&self) -> (Client, i64) {
        let client = self.client();
        let res = self.register(&client, &unique_email("eleve"), "student").await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        (client, body["id"].as_i64().unwrap())
    }

    /// Registers a teacher, has the admin approve them and returns their client and id.
    pub async fn approved_teacher(&self) -> (Client, i64) {
        let client = self.client();
        let res = self.register(&client, &unique_email("prof"), "teacher").await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        let id = body["id"].as_i64().unwrap();

        let admin = self.admin().await;
        let res = admin
            .post(self.url(&format!("/api/admin/teachers/{}/approve", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);

        (client, id)
    }

    pub async fn create_course(&self, client: &Client, title: &str) -> Response {
        self.create_course_with_pdf(client, title, b"%PDF-1.4 test".to_vec())
            .await
    }

    pub async fn create_course_with_pdf(
        &self,
        client: &Client,
        title: &str,
        pdf: Vec<u8>,
    ) -> Response {
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("description", "Un cours complet avec exercices corrigés")
            .text("subject", "mathematiques")
            .text("level", "lycee")
            .part(
                "pdf",
                multipart::Part::bytes(pdf)
                    .file_name("chapitre.pdf")
                    .mime_str("application/pdf")
                    .unwrap(),
            );

        client
            .post(self.url("/api/courses"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_live(&self, client: &Client, scheduled_at: &str, duration: i64) -> Response {
        client
            .post(self.url("/api/live-courses"))
            .json(&json!({
                "title": "Révisions du bac",
                "description": "Questions ouvertes",
                "subject": "physique",
                "level": "lycee",
                "scheduledAt": scheduled_at,
                "duration": duration
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

/// Spawns the app on a random port, backed by a fresh `MemoryStore`,
/// a private upload directory and a seeded admin.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Same as `spawn_app`, with a hook to adjust the configuration first.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let upload_dir = std::env::temp_dir().join(format!("edurenfort-{}", uuid::Uuid::new_v4()));

    let mut config = Config {
        database_url: String::new(),
        rust_log: "error".to_string(),
        port: 0,
        production: false,
        upload_dir: upload_dir.clone(),
        max_upload_bytes: 50 * 1024 * 1024,
        session_ttl_days: 7,
        meeting_base_url: "https://meet.example.test".to_string(),
        meeting_room_prefix: "edurenfort".to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        cors_origins: vec!["http://localhost:3000".to_string()],
    };
    configure(&mut config);

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    seed::ensure_admin(store.as_ref(), &config)
        .await
        .expect("Failed to seed admin");

    let state = AppState::new(store.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        upload_dir,
    }
}
