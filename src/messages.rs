// src/messages.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::employees::path_id;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{parse_object_id, Message, MessageView};
use crate::store::user_index;

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    pub recipient_id: Option<String>,
}

async fn message_views(state: &AppState, messages: &[Message]) -> Result<Vec<MessageView>, ApiError> {
    let mut senders: Vec<ObjectId> = messages.iter().map(|m| m.sender).collect();
    senders.sort();
    senders.dedup();
    let users = user_index(state.users.as_ref(), &senders).await?;
    Ok(messages.iter().map(|m| MessageView::build(m, &users)).collect())
}

/// POST /api/messages/send
///
/// No recipient means a broadcast to everyone.
pub async fn send_message(
    auth: AuthUser,
    data: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("send_message called by {}", auth.id);
    let text = body.message.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Message is required"));
    }

    let recipient = match body.recipient_id.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => {
            let id = parse_object_id(raw)
                .ok_or_else(|| ApiError::validation("Invalid recipient id"))?;
            if data.users.find_user(&id).await?.is_none() {
                return Err(ApiError::not_found("Recipient not found"));
            }
            Some(id)
        }
        None => None,
    };

    let message = Message::new(auth.id, recipient, text.to_string());
    data.messages.insert_message(&message).await?;
    match recipient {
        Some(to) => info!("Message {} sent from {} to {}", message.id, auth.id, to),
        None => info!("Broadcast {} sent by {}", message.id, auth.id),
    }

    let view = message_views(&data, std::slice::from_ref(&message))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal("message view missing"))?;
    Ok(HttpResponse::Created().json(json!({ "message": view })))
}

/// GET /api/messages/broadcast
pub async fn broadcast_messages(
    _auth: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let messages = data.messages.list_broadcast().await?;
    Ok(HttpResponse::Ok().json(json!({ "messages": message_views(&data, &messages).await? })))
}

/// GET /api/messages/employee/{employee_id}
///
/// Both directions of the conversation between the caller and the employee.
pub async fn thread_messages(
    auth: AuthUser,
    data: web::Data<AppState>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let other = path_id(&employee_id)?;
    let messages = data.messages.list_thread(&auth.id, &other).await?;
    Ok(HttpResponse::Ok().json(json!({ "messages": message_views(&data, &messages).await? })))
}
