//! Billing recurrence calculations
//!
//! Pure functions turning a subscription's cadence and charges into dates and
//! amounts. Every function takes `today` explicitly; nothing here reads the
//! clock.
//!
//! Two notions of a cycle are used:
//! - a coarse day count per cadence ([`RecurringDuration::cycle_days`]) to
//!   decide how many cycles have elapsed, and
//! - calendar-accurate placement ([`occurrence`]) for the actual dates, with
//!   month-based cadences clamped to the last day of short months.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

use crate::models::{Charge, RecurringDuration, Subscription};

impl RecurringDuration {
    /// Approximate cycle length in days
    pub fn cycle_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::BiWeekly => 14,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::SemiAnnually => 180,
            Self::Yearly => 365,
        }
    }

    /// Average number of billing cycles falling in one calendar month
    pub fn cycles_per_month(&self) -> f64 {
        match self {
            Self::Weekly => 365.0 / 12.0 / 7.0,
            Self::BiWeekly => 365.0 / 12.0 / 14.0,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::SemiAnnually => 1.0 / 6.0,
            Self::Yearly => 1.0 / 12.0,
        }
    }

    fn step(&self) -> Step {
        match self {
            Self::Weekly => Step::Days(7),
            Self::BiWeekly => Step::Days(14),
            Self::Monthly => Step::Months(1),
            Self::Quarterly => Step::Months(3),
            Self::SemiAnnually => Step::Months(6),
            Self::Yearly => Step::Months(12),
        }
    }
}

#[derive(Clone, Copy)]
enum Step {
    Days(u64),
    Months(u32),
}

/// Number of days in the given month, leap years included
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// `n` months after `start`'s month, on `day_of_month` clamped to the month length
fn month_with_day(start: NaiveDate, n: u32, day_of_month: u32) -> NaiveDate {
    let total = start.year() as i64 * 12 + start.month0() as i64 + n as i64;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    let day = day_of_month.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

/// Date of the `n`th billing (0-based) of a charge
///
/// Monthly billing lands on the charge's `day_of_month`; the other month-based
/// cadences keep the start date's day, clamped in short months.
pub fn occurrence(charge: &Charge, cadence: RecurringDuration, n: u32) -> NaiveDate {
    let start = charge.start_date;
    match (cadence, cadence.step()) {
        (RecurringDuration::Monthly, _) => month_with_day(start, n, charge.day_of_month),
        (_, Step::Days(days)) => start
            .checked_add_days(Days::new(days * n as u64))
            .unwrap_or(NaiveDate::MAX),
        (_, Step::Months(months)) => start
            .checked_add_months(Months::new(months.saturating_mul(n)))
            .unwrap_or(NaiveDate::MAX),
    }
}

/// A cycle index whose occurrence is not after `today`'s cycle
fn cycles_before(charge: &Charge, cadence: RecurringDuration, today: NaiveDate) -> u32 {
    let start = charge.start_date;
    if start >= today {
        return 0;
    }
    match cadence.step() {
        Step::Days(days) => ((today - start).num_days() as u64 / days) as u32,
        Step::Months(months) => {
            let between = (today.year() - start.year()) * 12 + today.month() as i32
                - start.month() as i32;
            (between.max(0) as u32 / months).saturating_sub(1)
        }
    }
}

/// First billing date of one charge on or after `today`
pub fn next_charge_date(charge: &Charge, cadence: RecurringDuration, today: NaiveDate) -> NaiveDate {
    let mut n = cycles_before(charge, cadence, today);
    loop {
        let date = occurrence(charge, cadence, n);
        if date >= today {
            return date;
        }
        n += 1;
    }
}

/// Next date on or after `today` on which any charge of `sub` bills
///
/// A subscription that has not started yet renews on its start date.
pub fn next_renewal_date(sub: &Subscription, today: NaiveDate) -> NaiveDate {
    if sub.start_date > today {
        return sub.start_date;
    }
    sub.effective_charges()
        .iter()
        .map(|charge| next_charge_date(charge, sub.recurring_duration, today))
        .min()
        .unwrap_or(sub.start_date)
}

/// Cycles billed so far for a charge, counting the one covering `today`
pub fn elapsed_cycles(charge: &Charge, cadence: RecurringDuration, today: NaiveDate) -> u32 {
    if charge.start_date > today {
        return 0;
    }
    let days = (today - charge.start_date).num_days();
    (days / cadence.cycle_days()) as u32 + 1
}

/// Whether a payment date has already passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Scheduled,
}

/// One reconstructed billing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    #[serde(with = "crate::models::iso_date")]
    pub date: NaiveDate,
    pub amount: f64,
    pub status: PaymentStatus,
}

/// Every billing of every charge up to the cycle covering `today`, by date
///
/// Status comes from comparing each date with `today`, so an entry that the
/// coarse cycle count places past `today` is reported as scheduled.
pub fn payment_history(sub: &Subscription, today: NaiveDate) -> Vec<Payment> {
    if sub.start_date > today {
        return Vec::new();
    }

    let cadence = sub.recurring_duration;
    let mut payments: Vec<Payment> = sub
        .effective_charges()
        .iter()
        .flat_map(|charge| {
            (0..elapsed_cycles(charge, cadence, today)).map(move |n| {
                let date = occurrence(charge, cadence, n);
                Payment {
                    date,
                    amount: charge.amount,
                    status: if date <= today {
                        PaymentStatus::Paid
                    } else {
                        PaymentStatus::Scheduled
                    },
                }
            })
        })
        .collect();

    // Stable: same-day charges keep their declared order
    payments.sort_by_key(|p| p.date);
    payments
}

/// Sum of the payment history
pub fn total_spent(sub: &Subscription, today: NaiveDate) -> f64 {
    payment_history(sub, today).iter().map(|p| p.amount).sum()
}

/// Average cost per calendar month of a per-cycle price
pub fn monthly_cost(price: f64, cadence: RecurringDuration) -> f64 {
    price * cadence.cycles_per_month()
}

/// Monthly-equivalent cost of a subscription
pub fn monthly_equivalent(sub: &Subscription) -> f64 {
    monthly_cost(sub.price, sub.recurring_duration)
}

/// How soon the next renewal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RenewalOutlook {
    Today,
    Tomorrow,
    /// Within the coming week (2..=6 days)
    InDays(i64),
    #[serde(with = "crate::models::iso_date")]
    Later(NaiveDate),
}

impl RenewalOutlook {
    pub fn label(&self) -> String {
        match self {
            Self::Today => "Renews today".to_string(),
            Self::Tomorrow => "Renews tomorrow".to_string(),
            Self::InDays(days) => format!("Renews in {} days", days),
            Self::Later(date) => format!("Next renewal {}", date),
        }
    }
}

pub fn renewal_outlook(sub: &Subscription, today: NaiveDate) -> RenewalOutlook {
    let next = next_renewal_date(sub, today);
    match (next - today).num_days() {
        0 => RenewalOutlook::Today,
        1 => RenewalOutlook::Tomorrow,
        days if days < 7 => RenewalOutlook::InDays(days),
        _ => RenewalOutlook::Later(next),
    }
}

/// Everything the details view shows for one subscription
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    pub subscription: Subscription,
    #[serde(with = "crate::models::iso_date")]
    pub next_renewal: NaiveDate,
    pub renewal: RenewalOutlook,
    pub monthly_cost: f64,
    pub total_spent: f64,
    pub payments: Vec<Payment>,
}

impl SubscriptionDetails {
    pub fn compute(subscription: Subscription, today: NaiveDate) -> Self {
        let payments = payment_history(&subscription, today);
        Self {
            next_renewal: next_renewal_date(&subscription, today),
            renewal: renewal_outlook(&subscription, today),
            monthly_cost: monthly_equivalent(&subscription),
            total_spent: payments.iter().map(|p| p.amount).sum(),
            payments,
            subscription,
        }
    }
}
