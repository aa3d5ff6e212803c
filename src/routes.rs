// src/routes.rs

use std::path::Path;

use actix_files::Files;
use actix_web::{error::JsonPayloadError, web, HttpRequest};
use log::debug;

use crate::auth::{login, me, register};
use crate::employees::{
    create_employee, delete_employee, get_employee, list_employees, my_profile, update_employee,
};
use crate::error::ApiError;
use crate::messages::{broadcast_messages, send_message, thread_messages};
use crate::project_feed::{add_review, list_reviews, list_updates, set_update_status, share_update};
use crate::projects::{
    create_project, delete_project, get_project, list_projects, my_projects, toggle_status,
    update_project,
};

/// Malformed or oversized JSON bodies come back as `{"message"}` 400s like
/// every other validation failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, req: &HttpRequest| {
        debug!("Rejected JSON body on {}: {}", req.path(), err);
        ApiError::validation(format!("Invalid request body: {}", err)).into()
    })
}

/// Everything under `/api`.
pub fn api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            // AUTH
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/me", web::get().to(me)),
            )
            // EMPLOYEES
            .service(
                web::scope("/employees")
                    .route("", web::get().to(list_employees))
                    .route("", web::post().to(create_employee))
                    .route("/me", web::get().to(my_profile))
                    .route("/{id}", web::get().to(get_employee))
                    .route("/{id}", web::put().to(update_employee))
                    .route("/{id}", web::delete().to(delete_employee)),
            )
            // PROJECTS
            .service(
                web::scope("/projects")
                    .route("", web::get().to(list_projects))
                    .route("", web::post().to(create_project))
                    // Must stay ahead of "/{id}".
                    .route("/my-projects", web::get().to(my_projects))
                    .route("/{id}", web::get().to(get_project))
                    .route("/{id}", web::put().to(update_project))
                    .route("/{id}", web::delete().to(delete_project))
                    .route("/{id}/toggle-status", web::patch().to(toggle_status))
                    .route("/{id}/share", web::post().to(share_update))
                    .route("/{id}/updates", web::get().to(list_updates))
                    .route(
                        "/{project_id}/updates/{update_id}",
                        web::put().to(set_update_status),
                    )
                    .route("/{id}/review", web::post().to(add_review))
                    .route("/{id}/reviews", web::get().to(list_reviews)),
            )
            // MESSAGES
            .service(
                web::scope("/messages")
                    .route("/send", web::post().to(send_message))
                    .route("/broadcast", web::get().to(broadcast_messages))
                    .route("/employee/{employee_id}", web::get().to(thread_messages)),
            ),
    );
}

/// Shared files, served as-is from the upload directory.
pub fn uploads(dir: &Path) -> Files {
    Files::new("/uploads", dir)
}
