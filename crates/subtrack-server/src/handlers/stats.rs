//! Portfolio statistics handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::today;
use crate::{audit, AppError, AppState, AuthUser};
use subtrack_core::{portfolio_stats, stats_by_currency, PortfolioStats};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Restrict to one currency code
    pub currency: Option<String>,
}

/// GET /api/stats - Per-currency figures, never summed across currencies
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<PortfolioStats>>, AppError> {
    let subs = state.repo.get_all(user.id())?;
    let today = today();

    let stats = match query.currency.as_deref().map(str::trim) {
        Some(currency) if !currency.is_empty() => {
            vec![portfolio_stats(&subs, currency, today)]
        }
        _ => stats_by_currency(&subs, today),
    };

    audit(
        user.id(),
        "stats",
        None,
        Some(&format!("currencies={}", stats.len())),
    );

    Ok(Json(stats))
}
