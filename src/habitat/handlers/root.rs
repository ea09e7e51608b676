use super::Message;
use axum::response::{IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/",
    responses (
        (status = 200, description = "The API is up", body = Message),
    ),
    tag = "health"
)]
pub async fn root() -> impl IntoResponse {
    Json(Message {
        message: "API running!".to_string(),
    })
}
