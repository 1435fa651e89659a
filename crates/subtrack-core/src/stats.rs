//! Portfolio statistics
//!
//! Amounts in different currencies are never added together: every figure
//! here is computed over the subscriptions of a single currency.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Subscription;
use crate::recurrence::{monthly_equivalent, total_spent};

/// Subscription with the highest monthly-equivalent cost
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostlySubscription {
    pub id: String,
    pub title: String,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub currency: String,
    pub count: usize,
    pub total_monthly_cost: f64,
    pub total_spent: f64,
    pub most_costly: Option<CostlySubscription>,
    pub average_monthly_cost: f64,
}

/// Currency codes in order of first appearance
pub fn currencies(subs: &[Subscription]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for sub in subs {
        if !seen.iter().any(|c| c == &sub.currency) {
            seen.push(sub.currency.clone());
        }
    }
    seen
}

/// Subscriptions grouped by currency, groups in order of first appearance
pub fn group_by_currency(subs: &[Subscription]) -> Vec<(String, Vec<&Subscription>)> {
    currencies(subs)
        .into_iter()
        .map(|currency| {
            let group = subs.iter().filter(|s| s.currency == currency).collect();
            (currency, group)
        })
        .collect()
}

/// Figures for the subscriptions billed in `currency`
///
/// Ties for most costly go to the first subscription in input order.
pub fn portfolio_stats(subs: &[Subscription], currency: &str, today: NaiveDate) -> PortfolioStats {
    let currency = currency.trim().to_uppercase();
    let group: Vec<&Subscription> = subs.iter().filter(|s| s.currency == currency).collect();

    let mut total_monthly_cost = 0.0;
    let mut spent = 0.0;
    let mut most_costly: Option<CostlySubscription> = None;

    for sub in &group {
        let monthly = monthly_equivalent(sub);
        total_monthly_cost += monthly;
        spent += total_spent(sub, today);

        if most_costly.as_ref().map_or(true, |m| monthly > m.monthly_cost) {
            most_costly = Some(CostlySubscription {
                id: sub.id.clone(),
                title: sub.title.clone(),
                monthly_cost: monthly,
            });
        }
    }

    let count = group.len();
    PortfolioStats {
        currency,
        count,
        total_monthly_cost,
        total_spent: spent,
        most_costly,
        average_monthly_cost: if count == 0 {
            0.0
        } else {
            total_monthly_cost / count as f64
        },
    }
}

/// One [`PortfolioStats`] per currency present
pub fn stats_by_currency(subs: &[Subscription], today: NaiveDate) -> Vec<PortfolioStats> {
    currencies(subs)
        .iter()
        .map(|currency| portfolio_stats(subs, currency, today))
        .collect()
}
