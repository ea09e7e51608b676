use super::Message;
use axum::response::{IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/blog",
    responses (
        (status = 200, description = "Blog placeholder", body = Message),
    ),
    tag = "blog"
)]
pub async fn blog() -> impl IntoResponse {
    Json(Message {
        message: "Blog coming soon".to_string(),
    })
}
