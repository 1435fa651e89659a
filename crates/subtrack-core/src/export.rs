//! Export and import of a user's subscriptions as a JSON document
//!
//! Export wraps the full collection with a format version and timestamp.
//! Import accepts that document or a bare array of records, validates each
//! record on its own, and reports failures per record instead of aborting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{ChargeInput, NewSubscription, Subscription, SubscriptionInput};
use crate::repository::SubscriptionRepository;
use crate::validate::validate_subscription;

/// Format version written into every export
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub subscriptions: Vec<Subscription>,
}

impl ExportDocument {
    pub fn new(subscriptions: Vec<Subscription>, now: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: now,
            subscriptions,
        }
    }

    /// Suggested download name, e.g. `subscriptions-2024-03-01.json`
    pub fn file_name(&self) -> String {
        format!("subscriptions-{}.json", self.export_date.format("%Y-%m-%d"))
    }
}

pub fn export_subscriptions(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<ExportDocument> {
    let subs = repo.get_all(user_id)?;
    info!(count = subs.len(), "Exported subscriptions");
    Ok(ExportDocument::new(subs, now))
}

/// Options as sent by clients; `overwrite` wins over `merge`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub merge: bool,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Append to the existing collection
    #[default]
    Merge,
    /// Delete the existing collection first
    Replace,
}

impl From<ImportOptions> for ImportMode {
    fn from(options: ImportOptions) -> Self {
        if options.overwrite {
            Self::Replace
        } else {
            Self::Merge
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// Accepted document shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Bare(Vec<Value>),
    Wrapped { subscriptions: Vec<Value> },
}

/// Extract the candidate records from a parsed document
pub fn document_records(doc: Value) -> Result<Vec<Value>> {
    match serde_json::from_value::<ImportDocument>(doc) {
        Ok(ImportDocument::Bare(records)) | Ok(ImportDocument::Wrapped { subscriptions: records }) => {
            Ok(records)
        }
        Err(_) => Err(Error::Format(
            "expected an array of subscriptions or an object with a \"subscriptions\" array"
                .to_string(),
        )),
    }
}

/// A number that may also arrive as a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Whole part, fractions truncated
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Number(_) => None,
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCharge {
    amount: Option<Numeric>,
    day_of_month: Option<Numeric>,
    start_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRecord {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    price: Option<Numeric>,
    charges: Option<Vec<RawCharge>>,
    currency: Option<String>,
    recurring_duration: Option<String>,
    start_date: Option<String>,
}

/// Turn one candidate record into a storable subscription, or a reason
fn prepare_record(value: Value) -> std::result::Result<NewSubscription, String> {
    let raw: RawRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let (Some(title), Some(price), Some(currency), Some(recurring_duration), Some(start_date)) = (
        raw.title,
        raw.price,
        raw.currency,
        raw.recurring_duration,
        raw.start_date,
    ) else {
        return Err("Missing required fields".to_string());
    };

    let price = price
        .as_f64()
        .ok_or_else(|| "Price must be a number".to_string())?;

    let charges = raw.charges.map(|charges| {
        charges
            .into_iter()
            .map(|c| ChargeInput {
                amount: c.amount.and_then(|a| a.as_f64()),
                day_of_month: c.day_of_month.and_then(|d| d.as_int()),
                start_date: c.start_date.or_else(|| Some(start_date.clone())),
            })
            .collect()
    });

    validate_subscription(SubscriptionInput {
        title,
        description: raw.description,
        url: raw.url,
        price: Some(price),
        charges,
        currency,
        recurring_duration: Some(recurring_duration),
        start_date: Some(start_date),
    })
    .map_err(|errors| errors.to_string())
}

fn record_title(value: &Value) -> String {
    value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Import already-parsed JSON
///
/// A bad document shape fails the whole call; bad records only add to
/// [`ImportOutcome::errors`]. In replace mode the existing collection is
/// cleared even when no record turns out to be valid.
pub fn import_subscriptions(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    doc: Value,
    mode: ImportMode,
) -> Result<ImportOutcome> {
    let records = document_records(doc)?;
    let total = records.len();

    let mut valid = Vec::with_capacity(total);
    let mut errors = Vec::new();
    for record in records {
        let title = record_title(&record);
        match prepare_record(record) {
            Ok(new) => valid.push(new),
            Err(reason) => {
                warn!(title = %title, reason = %reason, "Skipping import record");
                errors.push(format!(
                    "Failed to import subscription \"{}\": {}",
                    title, reason
                ));
            }
        }
    }

    let created = match mode {
        ImportMode::Merge => repo.bulk_create(user_id, &valid)?,
        ImportMode::Replace => repo.replace_all(user_id, &valid)?,
    };

    info!(
        mode = ?mode,
        total,
        imported = created.len(),
        failed = errors.len(),
        "Import finished"
    );
    Ok(ImportOutcome {
        imported: created.len(),
        errors,
    })
}

/// Import from JSON text; unparseable text is a format error
pub fn import_json(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    text: &str,
    mode: ImportMode,
) -> Result<ImportOutcome> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| Error::Format(format!("not valid JSON: {}", e)))?;
    import_subscriptions(repo, user_id, doc, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::RecurringDuration;
    use crate::repository::MemoryRepository;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn record(title: &str) -> Value {
        json!({
            "title": title,
            "price": 5,
            "currency": "USD",
            "recurringDuration": "monthly",
            "startDate": "2024-01-01"
        })
    }

    #[test]
    fn test_accepts_bare_and_wrapped_documents() {
        let repo = MemoryRepository::new();
        let bare = import_subscriptions(&repo, "u", json!([record("A")]), ImportMode::Merge).unwrap();
        assert_eq!(bare.imported, 1);

        let wrapped = import_subscriptions(
            &repo,
            "u",
            json!({"version": "1.0.0", "subscriptions": [record("B"), record("C")]}),
            ImportMode::Merge,
        )
        .unwrap();
        assert_eq!(wrapped.imported, 2);
        assert_eq!(repo.get_all("u").unwrap().len(), 3);
    }

    #[test]
    fn test_unrecognized_shape_is_format_error() {
        let repo = MemoryRepository::new();
        for doc in [json!({"items": []}), json!("text"), json!(42), json!({"subscriptions": 3})] {
            let err = import_subscriptions(&repo, "u", doc, ImportMode::Merge).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format);
        }
        let err = import_json(&repo, "u", "{not json", ImportMode::Merge).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_empty_title_is_reported_not_fatal() {
        let repo = MemoryRepository::new();
        let outcome = import_subscriptions(
            &repo,
            "u",
            json!({"subscriptions": [record("")]}),
            ImportMode::Merge,
        )
        .unwrap();
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("Failed to import subscription \"Unknown\""));
        assert!(outcome.errors[0].contains("Title is required"));
    }

    #[test]
    fn test_bad_records_are_skipped_with_reasons() {
        let repo = MemoryRepository::new();
        let mut no_currency = record("No Currency");
        no_currency.as_object_mut().unwrap().remove("currency");
        let mut bad_price = record("Bad Price");
        bad_price["price"] = json!("free");

        let outcome = import_subscriptions(
            &repo,
            "u",
            json!([record("Good"), no_currency, bad_price]),
            ImportMode::Merge,
        )
        .unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(
            outcome.errors,
            vec![
                "Failed to import subscription \"No Currency\": Missing required fields".to_string(),
                "Failed to import subscription \"Bad Price\": Price must be a number".to_string(),
            ]
        );
    }

    #[test]
    fn test_numeric_strings_and_charge_defaults() {
        let repo = MemoryRepository::new();
        let doc = json!([{
            "title": "SIP",
            "price": "0",
            "currency": "inr",
            "recurringDuration": "monthly",
            "startDate": "2024-02-01",
            "charges": [
                {"amount": "1000", "dayOfMonth": "5"},
                {"amount": 500, "dayOfMonth": 20, "startDate": "2024-03-20"}
            ]
        }]);
        let outcome = import_subscriptions(&repo, "u", doc, ImportMode::Merge).unwrap();
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

        let sub = &repo.get_all("u").unwrap()[0];
        assert_eq!(sub.price, 1500.0);
        assert_eq!(sub.currency, "INR");
        let charges = sub.charges.as_ref().unwrap();
        assert_eq!(charges[0].start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(charges[0].day_of_month, 5);
        assert_eq!(sub.start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_replace_mode_swaps_collection() {
        let repo = MemoryRepository::new();
        import_subscriptions(
            &repo,
            "u",
            json!([record("old1"), record("old2"), record("old3")]),
            ImportMode::Merge,
        )
        .unwrap();

        let outcome = import_subscriptions(
            &repo,
            "u",
            json!([record("new1"), record("new2")]),
            ImportOptions {
                merge: false,
                overwrite: true,
            }
            .into(),
        )
        .unwrap();
        assert_eq!(outcome.imported, 2);

        let titles: Vec<_> = repo.get_all("u").unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["new1", "new2"]);
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let source = MemoryRepository::new();
        import_subscriptions(
            &source,
            "alice",
            json!([
                record("Netflix"),
                {
                    "title": "Gym",
                    "description": "Downtown",
                    "url": "https://gym.example",
                    "price": 99,
                    "currency": "EUR",
                    "recurringDuration": "yearly",
                    "startDate": "2023-06-15"
                }
            ]),
            ImportMode::Merge,
        )
        .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let doc = export_subscriptions(&source, "alice", now).unwrap();
        assert_eq!(doc.version, EXPORT_VERSION);
        assert_eq!(doc.file_name(), "subscriptions-2024-03-01.json");

        let text = serde_json::to_string_pretty(&doc).unwrap();
        let target = MemoryRepository::new();
        let outcome = import_json(&target, "bob", &text, ImportMode::Merge).unwrap();
        assert_eq!(outcome.imported, 2);

        let original: Vec<_> = source.get_all("alice").unwrap().iter().map(|s| s.to_new()).collect();
        let restored: Vec<_> = target.get_all("bob").unwrap().iter().map(|s| s.to_new()).collect();
        assert_eq!(original, restored);
        assert_eq!(restored[1].recurring_duration, RecurringDuration::Yearly);
    }
}
