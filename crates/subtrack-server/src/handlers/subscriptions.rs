//! Subscription management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::today;
use crate::{audit, AppError, AppState, AuthUser, SuccessResponse};
use subtrack_core::{
    service, Subscription, SubscriptionDetails, SubscriptionInput, SubscriptionPatch,
};

/// GET /api/subscriptions - List the caller's subscriptions
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let subscriptions = state.repo.get_all(user.id())?;

    audit(
        user.id(),
        "list",
        None,
        Some(&format!("count={}", subscriptions.len())),
    );

    Ok(Json(subscriptions))
}

/// POST /api/subscriptions - Validate and store a new subscription
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(input): Json<SubscriptionInput>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let sub = service::create_subscription(state.repo.as_ref(), user.id(), input)?;

    audit(user.id(), "create", Some(&sub.id), Some(&sub.title));

    Ok((StatusCode::CREATED, Json(sub)))
}

/// GET /api/subscriptions/:id
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Subscription>, AppError> {
    let sub = service::get_subscription(state.repo.as_ref(), user.id(), &id)?;

    audit(user.id(), "view", Some(&id), None);

    Ok(Json(sub))
}

/// PATCH /api/subscriptions/:id - Partial update, revalidated as a whole
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SubscriptionPatch>,
) -> Result<Json<Subscription>, AppError> {
    let sub = service::update_subscription(state.repo.as_ref(), user.id(), &id, patch)?;

    audit(user.id(), "update", Some(&id), None);

    Ok(Json(sub))
}

/// DELETE /api/subscriptions/:id
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    service::delete_subscription(state.repo.as_ref(), user.id(), &id)?;

    audit(user.id(), "delete", Some(&id), None);

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/subscriptions/:id/details - Renewal, cost and payment history
pub async fn get_subscription_details(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionDetails>, AppError> {
    let sub = service::get_subscription(state.repo.as_ref(), user.id(), &id)?;
    let details = SubscriptionDetails::compute(sub, today());

    audit(
        user.id(),
        "view_details",
        Some(&id),
        Some(&format!("payments={}", details.payments.len())),
    );

    Ok(Json(details))
}
