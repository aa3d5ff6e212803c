#![allow(dead_code)]

use project_tracker::app_state::AppState;
use project_tracker::auth::hash_password;
use project_tracker::config::{Config, TEST_BCRYPT_COST};
use project_tracker::models::{Role, User, UserStatus};
use tempfile::TempDir;

pub const PASSWORD: &str = "pw12345678";

/// Full application over the in-memory store, wired the way `main` wires it.
macro_rules! init_app {
    ($state:expr) => {{
        let state: project_tracker::app_state::AppState = $state;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(project_tracker::middleware::Authentication::new(
                    state.tokens.clone(),
                ))
                .app_data(actix_web::web::Data::new(state.clone()))
                .configure(project_tracker::routes::api)
                .service(project_tracker::routes::uploads(&state.config.upload_dir)),
        )
        .await
    }};
}

/// Sends a request and returns the status with the JSON body.
macro_rules! call_json {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service($app, $req.to_request()).await;
        let status = resp.status().as_u16();
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        (status, body)
    }};
}

/// Keeps the upload directory alive for as long as the test runs.
pub struct TestEnv {
    pub state: AppState,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = dir.path().join("uploads");
        // The static file service resolves its directory once, at startup.
        std::fs::create_dir_all(&uploads).expect("upload dir");
        let state = AppState::in_memory(Config::for_tests(uploads));
        Self { state, dir }
    }

    /// Stores a user directly, bypassing the HTTP layer.
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        let hashed = hash_password(PASSWORD.to_string(), TEST_BCRYPT_COST)
            .await
            .expect("hash");
        let user = User::new(
            format!("{} name", username),
            username.to_string(),
            format!("{}@x.com", username),
            hashed,
            role,
            UserStatus::Active,
        );
        self.state.users.insert_user(&user).await.expect("insert");
        user
    }

    pub fn bearer(&self, user: &User) -> (&'static str, String) {
        let token = self.state.tokens.issue(&user.id, user.role).expect("token");
        ("Authorization", format!("Bearer {}", token))
    }
}
