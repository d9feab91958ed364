//! User index read model: name and email to user id.

use common::UserId;
use domain::{SystemEvent, UserEvent};
use event_store::{EventStore, RecordWrite};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::projection::Projection;

/// Table holding one record per user name.
pub const USER_INDEX: &str = "user_index";

/// Value stored under a user's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndexEntry {
    pub email: String,
    pub user_id: UserId,
}

/// Read model view resolving user names and emails to ids.
///
/// Names are unique at the storage layer: the index is written insert-only,
/// so a second user with an existing name fails the commit that would have
/// created it. Emails are only checked before a user is created.
#[derive(Debug, Clone)]
pub struct UserIndex<S> {
    store: S,
}

impl<S: EventStore> UserIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gets the index entry for a user name.
    pub async fn entry_by_name(&self, name: &str) -> Result<Option<UserIndexEntry>> {
        match self.store.get_record(USER_INDEX, name).await? {
            Some(record) => Ok(Some(serde_json::from_value(record.value)?)),
            None => Ok(None),
        }
    }

    pub async fn user_id_by_name(&self, name: &str) -> Result<Option<UserId>> {
        Ok(self.entry_by_name(name).await?.map(|e| e.user_id))
    }

    /// Gets the id of the user registered with `email`.
    ///
    /// If several names share the email, the first by name wins.
    pub async fn user_id_by_email(&self, email: &str) -> Result<Option<UserId>> {
        let records = self
            .store
            .find_records(USER_INDEX, "email", &serde_json::json!(email))
            .await?;

        match records.into_iter().next() {
            Some(record) => {
                let entry: UserIndexEntry = serde_json::from_value(record.value)?;
                Ok(Some(entry.user_id))
            }
            None => Ok(None),
        }
    }
}

impl<S: EventStore> Projection for UserIndex<S> {
    fn name(&self) -> &'static str {
        "UserIndex"
    }

    fn project(&self, event: &SystemEvent) -> Vec<RecordWrite> {
        match event {
            SystemEvent::User(UserEvent::Created(data)) => {
                let entry = UserIndexEntry {
                    email: data.email.clone(),
                    user_id: data.user_id,
                };
                vec![RecordWrite::insert(
                    USER_INDEX,
                    data.name.clone(),
                    serde_json::json!(entry),
                )]
            }
            SystemEvent::User(UserEvent::ShippingStarted(_) | UserEvent::ShippingOffered(_))
            | SystemEvent::Shipping(_)
            | SystemEvent::Negotiation(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ShipmentId;
    use event_store::{Commit, InMemoryEventStore, WriteMode};

    async fn index_with(entries: &[(&str, &str, UserId)]) -> UserIndex<InMemoryEventStore> {
        let store = InMemoryEventStore::new();
        let index = UserIndex::new(store.clone());

        let records = entries
            .iter()
            .flat_map(|(name, email, id)| {
                index.project(&SystemEvent::User(UserEvent::created(*id, *name, *email)))
            })
            .collect();
        store
            .commit(Commit {
                records,
                ..Commit::default()
            })
            .await
            .unwrap();

        index
    }

    #[test]
    fn created_event_is_an_insert_keyed_by_name() {
        let index = UserIndex::new(InMemoryEventStore::new());
        let user_id = UserId::new();

        let writes = index.project(&SystemEvent::User(UserEvent::created(
            user_id, "Julian", "a@b.c",
        )));

        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].mode, WriteMode::Insert);
        assert_eq!(writes[0].record.table, USER_INDEX);
        assert_eq!(writes[0].record.key, "Julian");
        assert_eq!(writes[0].record.value["email"], "a@b.c");
    }

    #[test]
    fn other_events_are_ignored() {
        let index = UserIndex::new(InMemoryEventStore::new());
        let event = UserEvent::shipping_started(ShipmentId::new(), UserId::new(), UserId::new());
        assert!(index.project(&SystemEvent::User(event)).is_empty());
        assert!(
            index
                .project(&SystemEvent::Negotiation(domain::NegotiationEvent::OfferCreated))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn looks_up_by_name_and_email() {
        let (julian, niklas) = (UserId::new(), UserId::new());
        let index = index_with(&[("Julian", "a@b.c", julian), ("Niklas", "b@c.d", niklas)]).await;

        assert_eq!(index.user_id_by_name("Julian").await.unwrap(), Some(julian));
        assert_eq!(index.user_id_by_email("b@c.d").await.unwrap(), Some(niklas));
        assert_eq!(index.user_id_by_name("Bob").await.unwrap(), None);
        assert_eq!(index.user_id_by_email("z@z.z").await.unwrap(), None);
    }
}
