//! Authentication-related handlers

use axum::Json;
use serde::Serialize;

use crate::{AuthMethod, AuthUser};

/// Response for the /api/me endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// The user id all subscription data is scoped to
    pub user: String,
    /// How the user was authenticated
    pub auth_method: AuthMethod,
}

/// GET /api/me - The currently authenticated user
pub async fn get_me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: user.0.user_id,
        auth_method: user.0.method,
    })
}
