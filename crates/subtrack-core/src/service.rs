//! Single-record operations: validate, then hand off to the repository

use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Subscription, SubscriptionInput, SubscriptionPatch};
use crate::repository::SubscriptionRepository;
use crate::validate::validate_subscription;

pub fn create_subscription(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    input: SubscriptionInput,
) -> Result<Subscription> {
    let new = validate_subscription(input)?;
    let sub = repo.create(user_id, &new)?;
    info!(id = %sub.id, title = %sub.title, "Created subscription");
    Ok(sub)
}

pub fn get_subscription(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    id: &str,
) -> Result<Subscription> {
    repo.get_by_id(user_id, id)?
        .ok_or_else(|| Error::not_found(id))
}

/// Merge `patch` over the stored record and revalidate the result
///
/// The whole merged record is checked, so a patch that only touches
/// `charges` still re-derives `price` and `startDate`.
pub fn update_subscription(
    repo: &dyn SubscriptionRepository,
    user_id: &str,
    id: &str,
    patch: SubscriptionPatch,
) -> Result<Subscription> {
    let existing = get_subscription(repo, user_id, id)?;
    let new = validate_subscription(patch.apply_to(&existing))?;
    let sub = repo.update(user_id, id, &new)?;
    info!(id = %sub.id, "Updated subscription");
    Ok(sub)
}

pub fn delete_subscription(repo: &dyn SubscriptionRepository, user_id: &str, id: &str) -> Result<()> {
    repo.delete(user_id, id)?;
    info!(id, "Deleted subscription");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ChargeInput;
    use crate::repository::MemoryRepository;
    use chrono::NaiveDate;

    fn input(title: &str) -> SubscriptionInput {
        SubscriptionInput {
            title: title.to_string(),
            price: Some(9.99),
            currency: "USD".to_string(),
            recurring_duration: Some("monthly".to_string()),
            start_date: Some("2024-01-31".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_rejects_invalid_without_storing() {
        let repo = MemoryRepository::new();
        let err = create_subscription(&repo, "alice", input("  ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(repo.get_all("alice").unwrap().is_empty());
    }

    #[test]
    fn test_update_switches_to_charges() {
        let repo = MemoryRepository::new();
        let sub = create_subscription(&repo, "alice", input("SIP")).unwrap();

        let patch = SubscriptionPatch {
            charges: Some(vec![
                ChargeInput {
                    amount: Some(50.0),
                    day_of_month: Some(1),
                    start_date: Some("2024-01-01".to_string()),
                },
                ChargeInput {
                    amount: Some(30.0),
                    day_of_month: Some(15),
                    start_date: Some("2024-01-15".to_string()),
                },
            ]),
            ..Default::default()
        };
        let updated = update_subscription(&repo, "alice", &sub.id, patch).unwrap();
        assert_eq!(updated.price, 80.0);
        assert_eq!(updated.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(updated.title, "SIP");
        assert_eq!(updated.created_at, sub.created_at);

        // An empty list goes back to a simple subscription at the derived price
        let patch = SubscriptionPatch {
            charges: Some(vec![]),
            ..Default::default()
        };
        let simple = update_subscription(&repo, "alice", &sub.id, patch).unwrap();
        assert!(simple.charges.is_none());
        assert_eq!(simple.price, 80.0);
    }

    #[test]
    fn test_invalid_patch_leaves_record_untouched() {
        let repo = MemoryRepository::new();
        let sub = create_subscription(&repo, "alice", input("Gym")).unwrap();
        let patch = SubscriptionPatch {
            url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        let err = update_subscription(&repo, "alice", &sub.id, patch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(get_subscription(&repo, "alice", &sub.id).unwrap().url.is_none());
    }

    #[test]
    fn test_other_users_records_are_not_found() {
        let repo = MemoryRepository::new();
        let sub = create_subscription(&repo, "alice", input("Gym")).unwrap();
        for err in [
            get_subscription(&repo, "bob", &sub.id).unwrap_err(),
            update_subscription(&repo, "bob", &sub.id, SubscriptionPatch::default()).unwrap_err(),
            delete_subscription(&repo, "bob", &sub.id).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
