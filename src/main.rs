// src/main.rs

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use project_tracker::app_state::AppState;
use project_tracker::config::Config;
use project_tracker::middleware::Authentication;
use project_tracker::routes;
use project_tracker::store::MongoDB;

fn cors(origin: Option<&str>) -> Cors {
    let cors = match origin {
        Some(origin) => Cors::default().allowed_origin(origin).supports_credentials(),
        None => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let mongodb = MongoDB::init(&config.mongo_uri, &config.database_name)
        .await
        .map_err(|e| {
            error!("Could not connect to MongoDB: {}", e);
            io::Error::new(io::ErrorKind::Other, e.to_string())
        })?;
    std::fs::create_dir_all(&config.upload_dir)?;

    let port = config.port;
    let state = AppState::with_mongo(Arc::new(mongodb), config);

    info!("Server running at http://0.0.0.0:{}", port);
    match &state.config.client_origin {
        Some(origin) => info!("Allowed CORS origin: {}", origin),
        None => info!("Allowed CORS origin: any"),
    }

    HttpServer::new(move || {
        App::new()
            .wrap(Authentication::new(state.tokens.clone()))
            .wrap(cors(state.config.client_origin.as_deref()))
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::api)
            .service(routes::uploads(&state.config.upload_dir))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
