//! Subscription storage interface
//!
//! Every operation is scoped to one user id; records owned by another user
//! behave as if they did not exist.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{NewSubscription, Subscription};

pub trait SubscriptionRepository: Send + Sync {
    /// All of the user's subscriptions, oldest first
    fn get_all(&self, user_id: &str) -> Result<Vec<Subscription>>;

    fn get_by_id(&self, user_id: &str, id: &str) -> Result<Option<Subscription>>;

    /// Store a validated subscription, assigning its id and creation time
    fn create(&self, user_id: &str, new: &NewSubscription) -> Result<Subscription>;

    /// Replace the editable fields of an existing record
    ///
    /// `id` and `created_at` are preserved. Fails with `NotFound` when the
    /// record is missing or owned by someone else.
    fn update(&self, user_id: &str, id: &str, new: &NewSubscription) -> Result<Subscription>;

    fn delete(&self, user_id: &str, id: &str) -> Result<()>;

    fn bulk_create(&self, user_id: &str, items: &[NewSubscription]) -> Result<Vec<Subscription>>;

    /// Delete the given ids, returning how many existed
    fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<usize>;

    /// Swap the user's whole collection for `items`
    ///
    /// Stores that can do this atomically should override it. The default
    /// deletes first, so a failure while creating leaves the collection
    /// partially replaced; that case is reported as a persistence error.
    fn replace_all(&self, user_id: &str, items: &[NewSubscription]) -> Result<Vec<Subscription>> {
        let ids: Vec<String> = self.get_all(user_id)?.into_iter().map(|s| s.id).collect();
        self.bulk_delete(user_id, &ids)?;
        self.bulk_create(user_id, items).map_err(|e| {
            Error::Persistence(format!(
                "replace removed {} subscriptions but failed to create new ones: {}",
                ids.len(),
                e
            ))
        })
    }
}

#[derive(Debug, Clone)]
struct Owned {
    user_id: String,
    sub: Subscription,
}

/// In-process store with no persistence
#[derive(Debug, Default)]
pub struct MemoryRepository {
    // Insertion order is kept separately so listings are stable
    records: RwLock<(Vec<String>, HashMap<String, Owned>)>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::Persistence("memory store lock poisoned".to_string())
    }
}

impl SubscriptionRepository for MemoryRepository {
    fn get_all(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let guard = self.records.read().map_err(|_| Self::poisoned())?;
        let (order, map) = &*guard;
        Ok(order
            .iter()
            .filter_map(|id| map.get(id))
            .filter(|o| o.user_id == user_id)
            .map(|o| o.sub.clone())
            .collect())
    }

    fn get_by_id(&self, user_id: &str, id: &str) -> Result<Option<Subscription>> {
        let guard = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(guard
            .1
            .get(id)
            .filter(|o| o.user_id == user_id)
            .map(|o| o.sub.clone()))
    }

    fn create(&self, user_id: &str, new: &NewSubscription) -> Result<Subscription> {
        let sub = new.clone().into_subscription(Utc::now());
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        let (order, map) = &mut *guard;
        order.push(sub.id.clone());
        map.insert(
            sub.id.clone(),
            Owned {
                user_id: user_id.to_string(),
                sub: sub.clone(),
            },
        );
        Ok(sub)
    }

    fn update(&self, user_id: &str, id: &str, new: &NewSubscription) -> Result<Subscription> {
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        let owned = guard
            .1
            .get_mut(id)
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| Error::not_found(id))?;

        let mut updated = new.clone().into_subscription(owned.sub.created_at);
        updated.id = owned.sub.id.clone();
        owned.sub = updated.clone();
        Ok(updated)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        match self.bulk_delete(user_id, &[id.to_string()])? {
            0 => Err(Error::not_found(id)),
            _ => Ok(()),
        }
    }

    fn bulk_create(&self, user_id: &str, items: &[NewSubscription]) -> Result<Vec<Subscription>> {
        items.iter().map(|item| self.create(user_id, item)).collect()
    }

    fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<usize> {
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        let (order, map) = &mut *guard;
        let mut removed = 0;
        for id in ids {
            if map.get(id).is_some_and(|o| o.user_id == user_id) {
                map.remove(id);
                removed += 1;
            }
        }
        order.retain(|id| map.contains_key(id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::RecurringDuration;
    use chrono::NaiveDate;

    fn new_sub(title: &str) -> NewSubscription {
        NewSubscription {
            title: title.to_string(),
            description: None,
            url: None,
            price: 9.99,
            charges: None,
            currency: "USD".to_string(),
            recurring_duration: RecurringDuration::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let repo = MemoryRepository::new();
        let a = repo.create("alice", &new_sub("A")).unwrap();
        let b = repo.create("alice", &new_sub("B")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(repo.get_all("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_listing_keeps_insertion_order() {
        let repo = MemoryRepository::new();
        for title in ["one", "two", "three"] {
            repo.create("alice", &new_sub(title)).unwrap();
        }
        let titles: Vec<_> = repo
            .get_all("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_users_are_isolated() {
        let repo = MemoryRepository::new();
        let a = repo.create("alice", &new_sub("A")).unwrap();

        assert!(repo.get_all("bob").unwrap().is_empty());
        assert!(repo.get_by_id("bob", &a.id).unwrap().is_none());
        assert!(matches!(
            repo.update("bob", &a.id, &new_sub("hijack")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(repo.delete("bob", &a.id), Err(Error::NotFound(_))));
        assert_eq!(repo.bulk_delete("bob", &[a.id.clone()]).unwrap(), 0);
        assert!(repo.get_by_id("alice", &a.id).unwrap().is_some());
    }

    #[test]
    fn test_update_preserves_identity() {
        let repo = MemoryRepository::new();
        let original = repo.create("alice", &new_sub("Old")).unwrap();
        let updated = repo.update("alice", &original.id, &new_sub("New")).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.title, "New");
    }

    #[test]
    fn test_replace_all_default() {
        let repo = MemoryRepository::new();
        for title in ["a", "b", "c"] {
            repo.create("alice", &new_sub(title)).unwrap();
        }
        repo.create("bob", &new_sub("bobs")).unwrap();

        let created = repo
            .replace_all("alice", &[new_sub("x"), new_sub("y")])
            .unwrap();
        assert_eq!(created.len(), 2);
        let titles: Vec<_> = repo
            .get_all("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["x", "y"]);
        assert_eq!(repo.get_all("bob").unwrap().len(), 1);
    }

    /// Memory store whose bulk inserts always fail
    struct FailingCreates(MemoryRepository);

    impl SubscriptionRepository for FailingCreates {
        fn get_all(&self, user_id: &str) -> Result<Vec<Subscription>> {
            self.0.get_all(user_id)
        }

        fn get_by_id(&self, user_id: &str, id: &str) -> Result<Option<Subscription>> {
            self.0.get_by_id(user_id, id)
        }

        fn create(&self, user_id: &str, new: &NewSubscription) -> Result<Subscription> {
            self.0.create(user_id, new)
        }

        fn update(&self, user_id: &str, id: &str, new: &NewSubscription) -> Result<Subscription> {
            self.0.update(user_id, id, new)
        }

        fn delete(&self, user_id: &str, id: &str) -> Result<()> {
            self.0.delete(user_id, id)
        }

        fn bulk_create(&self, _: &str, _: &[NewSubscription]) -> Result<Vec<Subscription>> {
            Err(Error::Persistence("disk full".to_string()))
        }

        fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<usize> {
            self.0.bulk_delete(user_id, ids)
        }
    }

    #[test]
    fn test_replace_all_default_reports_partial_failure() {
        let repo = FailingCreates(MemoryRepository::new());
        for title in ["a", "b", "c"] {
            repo.create("alice", &new_sub(title)).unwrap();
        }

        let err = repo.replace_all("alice", &[new_sub("x")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        let message = err.to_string();
        assert!(message.contains("removed 3 subscriptions"), "{}", message);
        assert!(message.contains("disk full"), "{}", message);

        // Deletion is not undone
        assert!(repo.get_all("alice").unwrap().is_empty());
    }
}
