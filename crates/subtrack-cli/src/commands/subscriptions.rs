//! Subscription command implementations

use anyhow::Result;
use chrono::NaiveDate;
use subtrack_core::{
    monthly_equivalent, renewal_outlook, service, Database, Error,
    PaymentStatus, Subscription, SubscriptionDetails, SubscriptionInput,
    SubscriptionRepository,
};

use super::{money, truncate};

pub fn cmd_subscriptions_list(db: &Database, user: &str, today: NaiveDate) -> Result<()> {
    let subscriptions = db.get_all(user)?;

    if subscriptions.is_empty() {
        println!("No subscriptions yet. Run:");
        println!("  subtrack subscriptions add --title <name> --price <amount> --start <date>");
        return Ok(());
    }

    println!();
    println!("📋 Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────────────");

    for sub in &subscriptions {
        let marker = if sub.is_multi_charge() { "◆" } else { "•" };
        println!(
            "   {} {:20} │ {:>14}/{:<11} │ {}",
            marker,
            truncate(&sub.title, 20),
            money(sub.total_price(), &sub.currency),
            sub.recurring_duration.as_str(),
            renewal_outlook(sub, today).label(),
        );
        println!("     {}", sub.id);
    }

    println!();
    println!("   {} subscription(s)", subscriptions.len());

    Ok(())
}

/// Validate and store a subscription; validation problems are listed per field
pub fn cmd_subscriptions_add(
    db: &Database,
    user: &str,
    input: SubscriptionInput,
) -> Result<Subscription> {
    let sub = match service::create_subscription(db, user, input) {
        Ok(sub) => sub,
        Err(Error::Validation(errors)) => {
            println!("❌ Subscription not saved:");
            for (field, message) in errors.iter() {
                println!("   {}: {}", field, message);
            }
            anyhow::bail!("Validation failed");
        }
        Err(e) => return Err(e.into()),
    };

    println!("✅ Added \"{}\" ({})", sub.title, sub.id);
    println!(
        "   {} {} · about {}/month",
        money(sub.total_price(), &sub.currency),
        sub.recurring_duration.label(),
        money(monthly_equivalent(&sub), &sub.currency),
    );

    Ok(sub)
}

pub fn cmd_subscriptions_show(db: &Database, user: &str, id: &str, today: NaiveDate) -> Result<()> {
    let sub = service::get_subscription(db, user, id)?;
    let details = SubscriptionDetails::compute(sub, today);
    let sub = &details.subscription;

    println!();
    println!("📄 {}", sub.title);
    if let Some(description) = &sub.description {
        println!("   {}", description);
    }
    if let Some(url) = &sub.url {
        println!("   🔗 {}", url);
    }
    println!("   ─────────────────────────────────────────");
    println!(
        "   Price:         {} {}",
        money(sub.total_price(), &sub.currency),
        sub.recurring_duration.label()
    );
    if let Some(charges) = &sub.charges {
        for charge in charges {
            println!(
                "     · {} on day {} from {}",
                money(charge.amount, &sub.currency),
                charge.day_of_month,
                charge.start_date
            );
        }
    }
    println!("   Started:       {}", sub.start_date);
    println!(
        "   Next renewal:  {} ({})",
        details.next_renewal,
        details.renewal.label()
    );
    println!(
        "   Monthly cost:  {}",
        money(details.monthly_cost, &sub.currency)
    );
    println!(
        "   Total spent:   {}",
        money(details.total_spent, &sub.currency)
    );

    if details.payments.is_empty() {
        println!();
        println!("   No payments yet.");
        return Ok(());
    }

    println!();
    println!("   Payment history:");
    for payment in &details.payments {
        let icon = match payment.status {
            PaymentStatus::Paid => "✅",
            PaymentStatus::Scheduled => "🕒",
        };
        println!(
            "   {} {} │ {:>14}",
            icon,
            payment.date,
            money(payment.amount, &sub.currency)
        );
    }

    Ok(())
}

pub fn cmd_subscriptions_remove(db: &Database, user: &str, id: &str) -> Result<()> {
    let sub = service::get_subscription(db, user, id)?;
    service::delete_subscription(db, user, id)?;

    println!("🗑️  Removed \"{}\" ({})", sub.title, sub.id);

    Ok(())
}
