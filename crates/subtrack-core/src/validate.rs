//! Input validation and normalization
//!
//! [`validate_subscription`] is the single gate between raw client input and
//! a storable [`NewSubscription`]. Every problem is reported against the field
//! it belongs to so a form can show them all at once.

use chrono::NaiveDate;
use url::Url;

use crate::error::ValidationErrors;
use crate::models::{parse_date, Charge, ChargeInput, NewSubscription, RecurringDuration, SubscriptionInput};

const MAX_CURRENCY_LEN: usize = 10;

/// Validate and normalize raw input
///
/// With a non-empty `charges` list, `price` is replaced by the sum of charge
/// amounts and `startDate` by the earliest charge start; the submitted values
/// for those two fields are ignored.
pub fn validate_subscription(
    input: SubscriptionInput,
) -> Result<NewSubscription, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = input.title.trim().to_string();
    if title.is_empty() {
        errors.add("title", "Title is required");
    }

    let description = non_empty(input.description);

    let url = non_empty(input.url);
    if let Some(ref raw) = url {
        if !is_web_url(raw) {
            errors.add("url", "Please enter a valid URL");
        }
    }

    let currency = normalize_currency(&input.currency, &mut errors);

    let recurring_duration = match input.recurring_duration.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("recurringDuration", "Billing cycle is required");
            None
        }
        Some(raw) => match raw.parse::<RecurringDuration>() {
            Ok(duration) => Some(duration),
            Err(_) => {
                errors.add("recurringDuration", format!("Unknown billing cycle: {}", raw));
                None
            }
        },
    };

    let charge_inputs = input.charges.unwrap_or_default();
    let (price, start_date, charges) = if charge_inputs.is_empty() {
        let price = match input.price {
            None => {
                errors.add("price", "Price is required");
                None
            }
            Some(p) if !is_positive(p) => {
                errors.add("price", "Price must be a positive number");
                None
            }
            Some(p) => Some(p),
        };
        let start_date = required_date(input.start_date.as_deref(), "startDate", &mut errors);
        (price, start_date, None)
    } else {
        let charges = validate_charges(&charge_inputs, &mut errors);
        let derived = charges.as_ref().map(|charges| {
            let total: f64 = charges.iter().map(|c| c.amount).sum();
            let earliest = charges.iter().map(|c| c.start_date).min();
            (total, earliest)
        });
        match derived {
            Some((total, _)) if !is_positive(total) => {
                errors.add("price", "Sum of charge amounts is too large");
                (None, None, None)
            }
            Some((total, Some(earliest))) => (Some(total), Some(earliest), charges),
            _ => (None, None, None),
        }
    };

    match (price, start_date, recurring_duration) {
        (Some(price), Some(start_date), Some(recurring_duration)) if errors.is_empty() => {
            Ok(NewSubscription {
                title,
                description,
                url,
                price,
                charges,
                currency,
                recurring_duration,
                start_date,
            })
        }
        _ => Err(errors),
    }
}

/// Charges are all-or-nothing: `None` if any of them is invalid
fn validate_charges(inputs: &[ChargeInput], errors: &mut ValidationErrors) -> Option<Vec<Charge>> {
    let mut charges = Vec::with_capacity(inputs.len());
    let mut ok = true;

    for (i, input) in inputs.iter().enumerate() {
        let amount = match input.amount {
            Some(a) if is_positive(a) => Some(a),
            _ => {
                errors.add(
                    format!("charges[{}].amount", i),
                    "All charge amounts must be positive numbers",
                );
                None
            }
        };

        let day_of_month = match input.day_of_month {
            Some(d) if (1..=31).contains(&d) => Some(d as u32),
            _ => {
                errors.add(
                    format!("charges[{}].dayOfMonth", i),
                    "Day of month must be between 1 and 31",
                );
                None
            }
        };

        let start_date = match input.start_date.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add(
                    format!("charges[{}].startDate", i),
                    "All charges must have a start date",
                );
                None
            }
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    errors.add(format!("charges[{}].startDate", i), "Invalid date");
                }
                parsed
            }
        };

        match (amount, day_of_month, start_date) {
            (Some(amount), Some(day_of_month), Some(start_date)) => charges.push(Charge {
                amount,
                day_of_month,
                start_date,
            }),
            _ => ok = false,
        }
    }

    ok.then_some(charges)
}

fn required_date(raw: Option<&str>, field: &str, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    match raw.map(str::trim) {
        None | Some("") => {
            errors.add(field, "Start date is required");
            None
        }
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add(field, "Invalid date");
            }
            parsed
        }
    }
}

/// Trimmed, uppercased ISO-style code
pub fn normalize_currency(raw: &str, errors: &mut ValidationErrors) -> String {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        errors.add("currency", "Currency is required");
    } else if code.len() > MAX_CURRENCY_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.add("currency", "Currency must be a short code such as USD");
    }
    code
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn valid_input() -> SubscriptionInput {
        SubscriptionInput {
            title: "Netflix".to_string(),
            price: Some(15.49),
            currency: "usd".to_string(),
            recurring_duration: Some("monthly".to_string()),
            start_date: Some("2024-01-15".to_string()),
            ..Default::default()
        }
    }

    fn charge(amount: f64, day: i64, start: &str) -> ChargeInput {
        ChargeInput {
            amount: Some(amount),
            day_of_month: Some(day),
            start_date: Some(start.to_string()),
        }
    }

    #[test]
    fn test_valid_simple_subscription() {
        let sub = validate_subscription(valid_input()).unwrap();
        assert_eq!(sub.title, "Netflix");
        assert_eq!(sub.currency, "USD");
        assert_eq!(sub.price, 15.49);
        assert_eq!(sub.recurring_duration, RecurringDuration::Monthly);
        assert_eq!(sub.start_date, date(2024, 1, 15));
        assert!(sub.charges.is_none());
    }

    #[test]
    fn test_whitespace_title_rejected() {
        let mut input = valid_input();
        input.title = "   ".to_string();
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("title"), Some("Title is required"));
    }

    #[test]
    fn test_price_rules() {
        for (price, expected) in [
            (None, "Price is required"),
            (Some(0.0), "Price must be a positive number"),
            (Some(-3.0), "Price must be a positive number"),
            (Some(f64::NAN), "Price must be a positive number"),
        ] {
            let mut input = valid_input();
            input.price = price;
            let errors = validate_subscription(input).unwrap_err();
            assert_eq!(errors.get("price"), Some(expected));
        }
    }

    #[test]
    fn test_url_must_be_http() {
        let mut input = valid_input();
        input.url = Some("ftp://example.com".to_string());
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("url"), Some("Please enter a valid URL"));

        let mut input = valid_input();
        input.url = Some("not a url".to_string());
        assert!(validate_subscription(input).is_err());

        let mut input = valid_input();
        input.url = Some(" https://netflix.com ".to_string());
        let sub = validate_subscription(input).unwrap();
        assert_eq!(sub.url.as_deref(), Some("https://netflix.com"));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let mut input = valid_input();
        input.url = Some("".to_string());
        input.description = Some("  ".to_string());
        let sub = validate_subscription(input).unwrap();
        assert!(sub.url.is_none());
        assert!(sub.description.is_none());
    }

    #[test]
    fn test_currency_and_duration_required() {
        let mut input = valid_input();
        input.currency = " ".to_string();
        input.recurring_duration = Some("fortnightly".to_string());
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("currency"), Some("Currency is required"));
        assert!(errors.get("recurringDuration").unwrap().contains("fortnightly"));
    }

    #[test]
    fn test_bad_start_date() {
        let mut input = valid_input();
        input.start_date = Some("15/01/2024".to_string());
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("startDate"), Some("Invalid date"));

        let mut input = valid_input();
        input.start_date = None;
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("startDate"), Some("Start date is required"));
    }

    #[test]
    fn test_charges_derive_price_and_start() {
        let mut input = valid_input();
        input.price = Some(999.0);
        input.start_date = None;
        input.charges = Some(vec![
            charge(50.0, 1, "2024-01-01"),
            charge(30.0, 15, "2024-01-15"),
        ]);
        let sub = validate_subscription(input).unwrap();
        assert_eq!(sub.price, 80.0);
        assert_eq!(sub.start_date, date(2024, 1, 1));
        assert_eq!(sub.charges.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_charge_sum_must_stay_finite() {
        let mut input = valid_input();
        input.start_date = None;
        input.charges = Some(vec![
            charge(1e308, 1, "2024-01-01"),
            charge(1e308, 2, "2024-01-02"),
        ]);
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(errors.get("price"), Some("Sum of charge amounts is too large"));
        assert_eq!(errors.get("charges[0].amount"), None);
    }

    #[test]
    fn test_charge_errors_are_keyed_by_index() {
        let mut input = valid_input();
        input.charges = Some(vec![
            charge(50.0, 1, "2024-01-01"),
            charge(-1.0, 32, "2024-01-15"),
            ChargeInput {
                amount: Some(5.0),
                day_of_month: Some(3),
                start_date: None,
            },
        ]);
        let errors = validate_subscription(input).unwrap_err();
        assert_eq!(
            errors.get("charges[1].amount"),
            Some("All charge amounts must be positive numbers")
        );
        assert_eq!(
            errors.get("charges[1].dayOfMonth"),
            Some("Day of month must be between 1 and 31")
        );
        assert_eq!(
            errors.get("charges[2].startDate"),
            Some("All charges must have a start date")
        );
        assert!(errors.get("charges[0].amount").is_none());
    }

    #[test]
    fn test_empty_charges_mean_simple_subscription() {
        let mut input = valid_input();
        input.charges = Some(vec![]);
        let sub = validate_subscription(input).unwrap();
        assert!(sub.charges.is_none());
        assert_eq!(sub.price, 15.49);
    }

    #[test]
    fn test_all_problems_reported_together() {
        let input = SubscriptionInput::default();
        let errors = validate_subscription(input).unwrap_err();
        for field in ["title", "price", "currency", "recurringDuration", "startDate"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }
}
