//! Community events

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{Map, json};

use super::transition::require_text;
use super::{ArchiveService, load, load_all, local_today};
use crate::data::{
    ArchiveEntry, EntityId, Event, EventStatus, Store, child_path, collections, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};

const ENTITY: &str = "event";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEvent {
    pub name: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub location: String,
    pub description: String,
    pub category: String,
    pub organizer: String,
    pub contact: String,
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub organizer: Option<String>,
    pub contact: Option<String>,
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("date must be YYYY-MM-DD, got {:?}", value)))
}

fn parse_time(value: &str) -> Result<String, AppError> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("time must be HH:MM, got {:?}", value)))?;
    Ok(time.format("%H:%M").to_string())
}

fn by_schedule(events: &mut [Event]) {
    events.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
}

/// Event service
pub struct EventService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    offset: FixedOffset,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>, archives: Arc<ArchiveService>, offset: FixedOffset) -> Self {
        Self {
            store,
            archives,
            offset,
        }
    }

    fn path(id: &str) -> String {
        child_path(collections::EVENTS, id)
    }

    /// Create an event; new events start `active`
    pub async fn create(&self, new_event: NewEvent) -> Result<Event, AppError> {
        let now = Utc::now();
        let event = Event {
            id: EntityId::new().0,
            name: require_text("name", &new_event.name)?,
            date: parse_date(&new_event.date)?,
            time: parse_time(&new_event.time)?,
            location: require_text("location", &new_event.location)?,
            description: require_text("description", &new_event.description)?,
            category: require_text("category", &new_event.category)?,
            organizer: require_text("organizer", &new_event.organizer)?,
            contact: require_text("contact", &new_event.contact)?,
            status: EventStatus::Active,
            featured: new_event.featured,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&Self::path(&event.id), encode(&event)?)
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(id = %event.id, date = %event.date, "Event created");
        Ok(event)
    }

    pub async fn get(&self, id: &str) -> Result<Event, AppError> {
        load(self.store.as_ref(), collections::EVENTS, ENTITY, id).await
    }

    /// All events by date
    pub async fn list(&self) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = load_all(self.store.as_ref(), collections::EVENTS).await?;
        by_schedule(&mut events);
        Ok(events)
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Event>, AppError> {
        let mut events = self.list().await?;
        events.retain(|e| e.category.eq_ignore_ascii_case(category.trim()));
        Ok(events)
    }

    pub async fn list_by_status(&self, status: EventStatus) -> Result<Vec<Event>, AppError> {
        let mut events = self.list().await?;
        events.retain(|e| e.status == status);
        Ok(events)
    }

    /// Active featured events
    pub async fn featured(&self) -> Result<Vec<Event>, AppError> {
        let mut events = self.list_by_status(EventStatus::Active).await?;
        events.retain(|e| e.featured);
        Ok(events)
    }

    /// Active events from today on
    pub async fn upcoming(&self) -> Result<Vec<Event>, AppError> {
        let today = local_today(self.offset);
        let mut events = self.list_by_status(EventStatus::Active).await?;
        events.retain(|e| e.date >= today);
        Ok(events)
    }

    /// Flip between `active` and `inactive`
    pub async fn toggle_status(&self, id: &str) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        let status = match event.status {
            EventStatus::Active => EventStatus::Inactive,
            EventStatus::Inactive => EventStatus::Active,
        };

        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        event.status = status;
        event.updated_at = now;
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, %status, "Event status toggled");
        Ok(event)
    }

    pub async fn toggle_featured(&self, id: &str) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        let now = Utc::now();

        let mut fields = Map::new();
        fields.insert("featured".to_string(), json!(!event.featured));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        event.featured = !event.featured;
        event.updated_at = now;
        Ok(event)
    }

    pub async fn update(&self, id: &str, changes: EventUpdate) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        let mut fields = Map::new();

        if let Some(date) = changes.date {
            event.date = parse_date(&date)?;
            fields.insert("date".to_string(), json!(event.date));
        }
        if let Some(time) = changes.time {
            event.time = parse_time(&time)?;
            fields.insert("time".to_string(), json!(event.time));
        }
        for (key, value, target) in [
            ("name", changes.name, &mut event.name),
            ("location", changes.location, &mut event.location),
            ("description", changes.description, &mut event.description),
            ("category", changes.category, &mut event.category),
            ("organizer", changes.organizer, &mut event.organizer),
            ("contact", changes.contact, &mut event.contact),
        ] {
            if let Some(value) = value {
                *target = require_text(key, &value)?;
                fields.insert(key.to_string(), json!(target));
            }
        }
        if fields.is_empty() {
            return Ok(event);
        }

        let now = Utc::now();
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;
        event.updated_at = now;
        Ok(event)
    }

    /// Soft delete through the archive
    pub async fn delete(&self, id: &str, archived_by: Option<&str>) -> Result<ArchiveEntry, AppError> {
        let event = self.get(id).await?;

        let mut preview = Map::new();
        preview.insert("name".to_string(), json!(event.name));
        preview.insert("date".to_string(), json!(event.date));
        preview.insert("status".to_string(), json!(event.status));

        self.archives
            .archive_record(collections::EVENTS, id, &[Self::path(id)], preview, archived_by)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::{create_test_store, philippine_time};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn create_service() -> (EventService, Arc<dyn Store>, TempDir) {
        let (store, temp_dir) = create_test_store().await;
        let service = EventService::new(
            store.clone(),
            Arc::new(ArchiveService::new(store.clone())),
            philippine_time(),
        );
        (service, store, temp_dir)
    }

    fn clean_up_drive(days_from_today: i64) -> NewEvent {
        let date = local_today(philippine_time()) + Duration::days(days_from_today);
        NewEvent {
            name: "Clean-up Drive".to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            time: "06:00".to_string(),
            location: "Barangay Hall".to_string(),
            description: "Bring gloves and sacks".to_string(),
            category: "Environment".to_string(),
            organizer: "SK Council".to_string(),
            contact: "09170000000".to_string(),
            featured: false,
        }
    }

    #[tokio::test]
    async fn create_starts_active() {
        let (service, _store, _temp_dir) = create_service().await;
        let event = service.create(clean_up_drive(3)).await.unwrap();

        assert_eq!(event.status, EventStatus::Active);
        assert!(!event.featured);
        assert_eq!(service.get(&event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn toggles_flip_and_persist() {
        let (service, _store, _temp_dir) = create_service().await;
        let id = service.create(clean_up_drive(3)).await.unwrap().id;

        assert_eq!(
            service.toggle_status(&id).await.unwrap().status,
            EventStatus::Inactive
        );
        assert_eq!(
            service.toggle_status(&id).await.unwrap().status,
            EventStatus::Active
        );
        assert!(service.toggle_featured(&id).await.unwrap().featured);
        assert_eq!(service.featured().await.unwrap().len(), 1);
        assert!(!service.toggle_featured(&id).await.unwrap().featured);
        assert!(service.featured().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upcoming_skips_past_and_inactive() {
        let (service, _store, _temp_dir) = create_service().await;
        service.create(clean_up_drive(-2)).await.unwrap();
        let later = service.create(clean_up_drive(10)).await.unwrap();
        let sooner = service.create(clean_up_drive(1)).await.unwrap();
        let inactive = service.create(clean_up_drive(5)).await.unwrap();
        service.toggle_status(&inactive.id).await.unwrap();

        let upcoming: Vec<String> = service
            .upcoming()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(upcoming, vec![sooner.id, later.id]);
        assert_eq!(service.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn update_validates_and_unknown_id_is_not_found() {
        let (service, store, _temp_dir) = create_service().await;
        let id = service.create(clean_up_drive(3)).await.unwrap().id;

        let updated = service
            .update(
                &id,
                EventUpdate {
                    location: Some("Covered Court".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.location, "Covered Court");
        assert!(matches!(
            service
                .update(
                    &id,
                    EventUpdate {
                        time: Some("6 AM".to_string()),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.toggle_status("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.get("events/missing").await.unwrap().is_none());
    }
}
