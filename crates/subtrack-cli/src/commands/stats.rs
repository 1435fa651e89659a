//! Stats command implementation

use anyhow::Result;
use chrono::NaiveDate;
use subtrack_core::{portfolio_stats, stats_by_currency, Database, SubscriptionRepository};

use super::{money, truncate};

/// Print one block per currency; amounts are never summed across currencies
pub fn cmd_stats(
    db: &Database,
    user: &str,
    currency: Option<&str>,
    today: NaiveDate,
) -> Result<()> {
    let subscriptions = db.get_all(user)?;

    let stats = match currency.map(str::trim) {
        Some(code) if !code.is_empty() => vec![portfolio_stats(&subscriptions, code, today)],
        _ => stats_by_currency(&subscriptions, today),
    };

    if stats.is_empty() {
        println!("No subscriptions yet.");
        return Ok(());
    }

    for s in &stats {
        println!();
        println!("📊 {} ({} subscriptions)", s.currency, s.count);
        println!("   ─────────────────────────────────────────");
        println!(
            "   Monthly total:    {}",
            money(s.total_monthly_cost, &s.currency)
        );
        println!(
            "   Monthly average:  {}",
            money(s.average_monthly_cost, &s.currency)
        );
        println!("   Spent so far:     {}", money(s.total_spent, &s.currency));
        if let Some(top) = &s.most_costly {
            println!(
                "   Most costly:      {} ({}/month)",
                truncate(&top.title, 24),
                money(top.monthly_cost, &s.currency)
            );
        }
    }

    Ok(())
}
