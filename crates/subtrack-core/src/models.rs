//! Domain models for subtrack

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a subscription bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurringDuration {
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Yearly,
}

impl RecurringDuration {
    pub const ALL: [RecurringDuration; 6] = [
        Self::Weekly,
        Self::BiWeekly,
        Self::Monthly,
        Self::Quarterly,
        Self::SemiAnnually,
        Self::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnually => "semi-annually",
            Self::Yearly => "yearly",
        }
    }

    /// Human label, e.g. "Semi-annually"
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::BiWeekly => "Bi-weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::SemiAnnually => "Semi-annually",
            Self::Yearly => "Yearly",
        }
    }
}

impl std::str::FromStr for RecurringDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "bi-weekly" | "biweekly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi-annually" | "semiannually" => Ok(Self::SemiAnnually),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown recurring duration: {}", s)),
        }
    }
}

impl std::fmt::Display for RecurringDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One independently recurring payment inside a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub amount: f64,
    /// Billing day (1-31); only used for monthly placement
    pub day_of_month: u32,
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
}

/// A recurring subscription owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-cycle total; the sum of `charges` when charges are present
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges: Option<Vec<Charge>>,
    pub currency: String,
    pub recurring_duration: RecurringDuration,
    /// Earliest charge date when charges are present
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_multi_charge(&self) -> bool {
        self.charges.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// The charges that actually bill, synthesizing one from
    /// `price`/`start_date` for simple subscriptions
    pub fn effective_charges(&self) -> Vec<Charge> {
        match &self.charges {
            Some(charges) if !charges.is_empty() => charges.clone(),
            _ => vec![Charge {
                amount: self.price,
                day_of_month: chrono::Datelike::day(&self.start_date),
                start_date: self.start_date,
            }],
        }
    }

    /// Per-cycle total across all charges
    pub fn total_price(&self) -> f64 {
        match &self.charges {
            Some(charges) if !charges.is_empty() => charges.iter().map(|c| c.amount).sum(),
            _ => self.price,
        }
    }

    /// The storable fields of this record
    pub fn to_new(&self) -> NewSubscription {
        NewSubscription {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            price: self.price,
            charges: self.charges.clone(),
            currency: self.currency.clone(),
            recurring_duration: self.recurring_duration,
            start_date: self.start_date,
        }
    }
}

/// A validated subscription ready to be stored
///
/// Only the validator builds these from user input, so `price` and
/// `start_date` are already consistent with `charges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: f64,
    pub charges: Option<Vec<Charge>>,
    pub currency: String,
    pub recurring_duration: RecurringDuration,
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
}

impl NewSubscription {
    /// Materialize with a fresh id and creation time
    pub fn into_subscription(self, created_at: DateTime<Utc>) -> Subscription {
        Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            url: self.url,
            price: self.price,
            charges: self.charges,
            currency: self.currency,
            recurring_duration: self.recurring_duration,
            start_date: self.start_date,
            created_at,
        }
    }
}

/// Raw charge fields as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeInput {
    pub amount: Option<f64>,
    pub day_of_month: Option<i64>,
    pub start_date: Option<String>,
}

impl From<&Charge> for ChargeInput {
    fn from(charge: &Charge) -> Self {
        Self {
            amount: Some(charge.amount),
            day_of_month: Some(charge.day_of_month as i64),
            start_date: Some(charge.start_date.to_string()),
        }
    }
}

/// Raw subscription fields as submitted by a client, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInput {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub charges: Option<Vec<ChargeInput>>,
    #[serde(default)]
    pub currency: String,
    pub recurring_duration: Option<String>,
    pub start_date: Option<String>,
}

impl From<&Subscription> for SubscriptionInput {
    fn from(sub: &Subscription) -> Self {
        Self {
            title: sub.title.clone(),
            description: sub.description.clone(),
            url: sub.url.clone(),
            price: Some(sub.price),
            charges: sub
                .charges
                .as_ref()
                .map(|charges| charges.iter().map(ChargeInput::from).collect()),
            currency: sub.currency.clone(),
            recurring_duration: Some(sub.recurring_duration.as_str().to_string()),
            start_date: Some(sub.start_date.to_string()),
        }
    }
}

/// Partial update; absent fields keep their stored value
///
/// `id` and `createdAt` are not part of the patch and are ignored if sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub price: Option<f64>,
    /// `Some(vec![])` converts back to a simple subscription
    pub charges: Option<Vec<ChargeInput>>,
    pub currency: Option<String>,
    pub recurring_duration: Option<String>,
    pub start_date: Option<String>,
}

impl SubscriptionPatch {
    /// Overlay this patch onto an existing record's fields
    pub fn apply_to(self, existing: &Subscription) -> SubscriptionInput {
        let mut input = SubscriptionInput::from(existing);
        if let Some(title) = self.title {
            input.title = title;
        }
        if let Some(description) = self.description {
            input.description = Some(description);
        }
        if let Some(url) = self.url {
            input.url = Some(url);
        }
        if let Some(price) = self.price {
            input.price = Some(price);
        }
        if let Some(charges) = self.charges {
            input.charges = Some(charges);
        }
        if let Some(currency) = self.currency {
            input.currency = currency;
        }
        if let Some(duration) = self.recurring_duration {
            input.recurring_duration = Some(duration);
        }
        if let Some(start_date) = self.start_date {
            input.start_date = Some(start_date);
        }
        input
    }
}

/// Parse a date given either as `YYYY-MM-DD` or as a full timestamp
///
/// Timestamps are reduced to their UTC calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.date())
}

/// Serde adapter: writes `YYYY-MM-DD`, reads anything [`parse_date`] accepts
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_date(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Subscription {
        Subscription {
            id: "sub-1".to_string(),
            title: "Netflix".to_string(),
            description: None,
            url: None,
            price: 15.49,
            charges: None,
            currency: "USD".to_string(),
            recurring_duration: RecurringDuration::Monthly,
            start_date: date(2024, 1, 15),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_duration_serde_names() {
        let json = serde_json::to_string(&RecurringDuration::BiWeekly).unwrap();
        assert_eq!(json, "\"bi-weekly\"");
        let parsed: RecurringDuration = serde_json::from_str("\"semi-annually\"").unwrap();
        assert_eq!(parsed, RecurringDuration::SemiAnnually);
    }

    #[test]
    fn test_duration_from_str_round_trips_as_str() {
        for duration in RecurringDuration::ALL {
            assert_eq!(duration.as_str().parse::<RecurringDuration>(), Ok(duration));
        }
        assert!("daily".parse::<RecurringDuration>().is_err());
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(parse_date("2024-02-29"), Some(date(2024, 2, 29)));
        assert_eq!(
            parse_date("2024-01-31T00:00:00.000Z"),
            Some(date(2024, 1, 31))
        );
        assert_eq!(parse_date("2024-01-31T10:00:00"), Some(date(2024, 1, 31)));
        assert_eq!(parse_date("31/01/2024"), None);
        assert_eq!(parse_date("2023-02-29"), None);
    }

    #[test]
    fn test_simple_subscription_synthesizes_charge() {
        let sub = sample();
        let charges = sub.effective_charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].amount, 15.49);
        assert_eq!(charges[0].day_of_month, 15);
        assert_eq!(charges[0].start_date, sub.start_date);
        assert!(!sub.is_multi_charge());
    }

    #[test]
    fn test_subscription_json_shape() {
        let mut sub = sample();
        sub.charges = Some(vec![Charge {
            amount: 10.0,
            day_of_month: 5,
            start_date: date(2024, 3, 5),
        }]);
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["recurringDuration"], "monthly");
        assert_eq!(json["startDate"], "2024-01-15");
        assert_eq!(json["charges"][0]["dayOfMonth"], 5);
        assert_eq!(json["charges"][0]["startDate"], "2024-03-05");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_patch_overlays_only_given_fields() {
        let existing = sample();
        let patch = SubscriptionPatch {
            title: Some("Netflix Premium".to_string()),
            price: Some(22.99),
            ..Default::default()
        };
        let input = patch.apply_to(&existing);
        assert_eq!(input.title, "Netflix Premium");
        assert_eq!(input.price, Some(22.99));
        assert_eq!(input.currency, "USD");
        assert_eq!(input.start_date.as_deref(), Some("2024-01-15"));
        assert_eq!(input.recurring_duration.as_deref(), Some("monthly"));
    }
}
