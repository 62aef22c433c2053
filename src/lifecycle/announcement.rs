//! Announcements
//!
//! `draft ⇄ published ──▶ expired`. Residents are told about an
//! announcement once, when it first goes out as published: a push to
//! everyone and an email to every account with an address.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, json};

use super::transition::{Transition, optional_text, require_text};
use super::{ArchiveService, load, load_all, local_today};
use crate::data::{
    Announcement, AnnouncementStatus, ArchiveEntry, EntityId, Store, UserProfile, Visibility,
    child_path, collections, encode,
};
use crate::error::AppError;
use crate::metrics::{RECORDS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::notify::{BulkOutcome, Dispatcher, EmailMessage, Notification, NotificationTarget};

const ENTITY: &str = "announcement";

/// Announcement as authored
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub author: String,
    /// `draft` (default) or `published`
    pub status: Option<AnnouncementStatus>,
    pub expires_on: Option<NaiveDate>,
}

/// Content edits; status is changed through publish/unpublish
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub visibility: Option<Visibility>,
    pub expires_on: Option<NaiveDate>,
}

enum AnnouncementAction {
    Publish,
    Unpublish,
    Expire,
}

impl Transition for AnnouncementAction {
    type Status = AnnouncementStatus;
    const ENTITY: &'static str = ENTITY;

    fn allowed_from(&self) -> &'static [AnnouncementStatus] {
        use AnnouncementStatus::*;
        match self {
            Self::Publish => &[Draft, Expired],
            Self::Unpublish => &[Published],
            Self::Expire => &[Published],
        }
    }

    fn target(&self) -> AnnouncementStatus {
        match self {
            Self::Publish => AnnouncementStatus::Published,
            Self::Unpublish => AnnouncementStatus::Draft,
            Self::Expire => AnnouncementStatus::Expired,
        }
    }
}

/// Announcement service
pub struct AnnouncementService {
    store: Arc<dyn Store>,
    archives: Arc<ArchiveService>,
    dispatcher: Dispatcher,
    offset: FixedOffset,
}

impl AnnouncementService {
    pub fn new(
        store: Arc<dyn Store>,
        archives: Arc<ArchiveService>,
        dispatcher: Dispatcher,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            archives,
            dispatcher,
            offset,
        }
    }

    fn path(id: &str) -> String {
        child_path(collections::ANNOUNCEMENTS, id)
    }

    pub async fn create(&self, draft: NewAnnouncement) -> Result<Announcement, AppError> {
        let status = draft.status.unwrap_or(AnnouncementStatus::Draft);
        if status == AnnouncementStatus::Expired {
            return Err(AppError::Validation(
                "announcements are created as draft or published".to_string(),
            ));
        }

        let today = local_today(self.offset);
        let now = Utc::now();
        let announcement = Announcement {
            id: EntityId::new().0,
            title: require_text("title", &draft.title)?,
            description: require_text("description", &draft.description)?,
            category: require_text("category", &draft.category)?,
            visibility: draft.visibility.unwrap_or(Visibility::Public),
            author: require_text("author", &draft.author)?,
            status,
            published_on: (status == AnnouncementStatus::Published).then_some(today),
            expires_on: draft.expires_on,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&Self::path(&announcement.id), encode(&announcement)?)
            .await?;

        RECORDS_CREATED_TOTAL.with_label_values(&[ENTITY]).inc();
        tracing::info!(id = %announcement.id, %status, "Announcement created");

        if status == AnnouncementStatus::Published {
            self.announce(&announcement).await;
        }
        Ok(announcement)
    }

    pub async fn get(&self, id: &str) -> Result<Announcement, AppError> {
        load(self.store.as_ref(), collections::ANNOUNCEMENTS, ENTITY, id).await
    }

    /// All announcements, newest first
    pub async fn list(&self) -> Result<Vec<Announcement>, AppError> {
        let mut announcements: Vec<Announcement> =
            load_all(self.store.as_ref(), collections::ANNOUNCEMENTS).await?;
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = self.list().await?;
        announcements.retain(|a| a.category.eq_ignore_ascii_case(category.trim()));
        Ok(announcements)
    }

    pub async fn list_by_status(
        &self,
        status: AnnouncementStatus,
    ) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = self.list().await?;
        announcements.retain(|a| a.status == status);
        Ok(announcements)
    }

    /// Published announcements a viewer may see
    pub async fn list_visible(&self, for_residents: bool) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = self.list_by_status(AnnouncementStatus::Published).await?;
        announcements.retain(|a| for_residents || a.visibility == Visibility::Public);
        Ok(announcements)
    }

    pub async fn update(
        &self,
        id: &str,
        changes: AnnouncementUpdate,
    ) -> Result<Announcement, AppError> {
        let mut announcement = self.get(id).await?;

        let mut fields = Map::new();
        if let Some(title) = changes.title {
            announcement.title = require_text("title", &title)?;
            fields.insert("title".to_string(), json!(announcement.title));
        }
        if let Some(description) = changes.description {
            announcement.description = require_text("description", &description)?;
            fields.insert("description".to_string(), json!(announcement.description));
        }
        if let Some(category) = changes.category {
            announcement.category = require_text("category", &category)?;
            fields.insert("category".to_string(), json!(announcement.category));
        }
        if let Some(visibility) = changes.visibility {
            announcement.visibility = visibility;
            fields.insert("visibility".to_string(), json!(visibility));
        }
        if let Some(expires_on) = changes.expires_on {
            announcement.expires_on = Some(expires_on);
            fields.insert("expiresOn".to_string(), json!(expires_on));
        }
        if fields.is_empty() {
            return Ok(announcement);
        }

        let now = Utc::now();
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;
        announcement.updated_at = now;
        Ok(announcement)
    }

    /// Publish a draft (or re-publish an expired one) as of today
    pub async fn publish(&self, id: &str) -> Result<Announcement, AppError> {
        let mut announcement = self.get(id).await?;
        let status = AnnouncementAction::Publish.apply_to(announcement.status)?;
        let first_publication = announcement.published_on.is_none();
        let today = local_today(self.offset);

        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("publishedOn".to_string(), json!(today));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        announcement.status = status;
        announcement.published_on = Some(today);
        announcement.updated_at = now;
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, "Announcement published");

        if first_publication {
            self.announce(&announcement).await;
        }
        Ok(announcement)
    }

    /// Back to draft; `publishedOn` is kept
    pub async fn unpublish(&self, id: &str) -> Result<Announcement, AppError> {
        let mut announcement = self.get(id).await?;
        let status = AnnouncementAction::Unpublish.apply_to(announcement.status)?;

        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store.update(&Self::path(id), fields).await?;

        announcement.status = status;
        announcement.updated_at = now;
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[ENTITY, status.as_str()])
            .inc();
        tracing::info!(id, "Announcement unpublished");
        Ok(announcement)
    }

    /// Expire published announcements whose `expiresOn` is before `today`
    ///
    /// Returns the ids that were expired.
    pub async fn expire_overdue(&self, today: NaiveDate) -> Result<Vec<String>, AppError> {
        let overdue: Vec<Announcement> = self
            .list_by_status(AnnouncementStatus::Published)
            .await?
            .into_iter()
            .filter(|a| a.expires_on.is_some_and(|expires_on| expires_on < today))
            .collect();

        let mut expired = Vec::with_capacity(overdue.len());
        for announcement in overdue {
            let status = AnnouncementAction::Expire.apply_to(announcement.status)?;
            let mut fields = Map::new();
            fields.insert("status".to_string(), json!(status));
            fields.insert("updatedAt".to_string(), json!(Utc::now()));
            self.store
                .update(&Self::path(&announcement.id), fields)
                .await?;
            STATUS_TRANSITIONS_TOTAL
                .with_label_values(&[ENTITY, status.as_str()])
                .inc();
            expired.push(announcement.id);
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired overdue announcements");
        }
        Ok(expired)
    }

    /// Soft delete through the archive
    pub async fn delete(
        &self,
        id: &str,
        archived_by: Option<&str>,
    ) -> Result<ArchiveEntry, AppError> {
        let announcement = self.get(id).await?;

        let mut preview = Map::new();
        preview.insert("title".to_string(), json!(announcement.title));
        preview.insert("category".to_string(), json!(announcement.category));
        preview.insert("status".to_string(), json!(announcement.status));

        self.archives
            .archive_record(
                collections::ANNOUNCEMENTS,
                id,
                &[Self::path(id)],
                preview,
                archived_by,
            )
            .await
    }

    /// Push to everyone and email every account that has an address
    async fn announce(&self, announcement: &Announcement) -> BulkOutcome {
        let notification = Notification::new(
            "announcement",
            NotificationTarget::everyone(),
            announcement.title.clone(),
            announcement.description.clone(),
        )
        .with_click_action("/announcements")
        .with_data("announcementId", announcement.id.as_str())
        .with_data("category", announcement.category.as_str());
        self.dispatcher.push(notification).await;

        let recipients = match self.recipients().await {
            Ok(recipients) => recipients,
            Err(error) => {
                tracing::warn!(%error, "Failed to load announcement recipients");
                return BulkOutcome::default();
            }
        };

        let barangay = self.dispatcher.settings().await.barangay_info.name.clone();
        let messages = recipients
            .iter()
            .map(|to| EmailMessage::announcement_created(to, announcement, &barangay))
            .collect();
        self.dispatcher.email_all(messages).await
    }

    /// Stored email addresses of resident accounts
    async fn recipients(&self) -> Result<BTreeSet<String>, AppError> {
        let users: Vec<UserProfile> = load_all(self.store.as_ref(), collections::USERS).await?;
        Ok(users
            .into_iter()
            .filter(UserProfile::is_resident)
            .filter_map(|user| optional_text(user.email))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::{
        create_test_store, dispatcher_with, philippine_time, quiet_dispatcher,
    };
    use crate::notify::{MockEmailSender, MockNotificationSender};
    use chrono::Duration;
    use tempfile::TempDir;

    fn service_with(store: Arc<dyn Store>, dispatcher: Dispatcher) -> AnnouncementService {
        AnnouncementService::new(
            store.clone(),
            Arc::new(ArchiveService::new(store)),
            dispatcher,
            philippine_time(),
        )
    }

    async fn create_service() -> (AnnouncementService, Arc<dyn Store>, TempDir) {
        let (store, temp_dir) = create_test_store().await;
        let service = service_with(store.clone(), quiet_dispatcher(store.clone()));
        (service, store, temp_dir)
    }

    fn water_interruption(status: Option<AnnouncementStatus>) -> NewAnnouncement {
        NewAnnouncement {
            title: "Water interruption".to_string(),
            description: "No water supply on Saturday 8AM-5PM".to_string(),
            category: "Utilities".to_string(),
            visibility: None,
            author: "Barangay Secretary".to_string(),
            status,
            expires_on: None,
        }
    }

    #[tokio::test]
    async fn publishing_on_create_notifies_every_resident_with_email() {
        let (store, _temp_dir) = create_test_store().await;
        for (uid, email) in [("u1", "a@example.com"), ("u2", "b@example.com"), ("u3", "")] {
            store
                .set(&format!("users/{}", uid), json!({ "email": email, "role": "resident" }))
                .await
                .unwrap();
        }
        store
            .set("users/u4", json!({ "role": "resident" }))
            .await
            .unwrap();

        let mut push = MockNotificationSender::new();
        push.expect_send()
            .withf(|n| n.target == NotificationTarget::everyone())
            .times(1)
            .returning(|_| Ok(()));
        let mut email = MockEmailSender::new();
        email.expect_send().times(2).returning(|message| {
            if message.to == "b@example.com" {
                Err(AppError::Notification("bounced".to_string()))
            } else {
                Ok(())
            }
        });
        let service = service_with(store.clone(), dispatcher_with(store.clone(), push, email));

        let announcement = service
            .create(water_interruption(Some(AnnouncementStatus::Published)))
            .await
            .unwrap();

        assert_eq!(announcement.published_on, Some(local_today(philippine_time())));
        assert_eq!(
            service.get(&announcement.id).await.unwrap().status,
            AnnouncementStatus::Published
        );
    }

    #[tokio::test]
    async fn announcement_email_skips_staff_accounts() {
        let (store, _temp_dir) = create_test_store().await;
        for (uid, email, role) in [
            ("r1", "res@example.ph", "resident"),
            ("a1", "admin@example.ph", "admin"),
            ("o1", "kagawad@example.ph", "official"),
        ] {
            store
                .set(&format!("users/{}", uid), json!({ "email": email, "role": role }))
                .await
                .unwrap();
        }

        let mut push = MockNotificationSender::new();
        push.expect_send().times(1).returning(|_| Ok(()));
        let mut email = MockEmailSender::new();
        email
            .expect_send()
            .withf(|message| message.to == "res@example.ph")
            .times(1)
            .returning(|_| Ok(()));
        let service = service_with(store.clone(), dispatcher_with(store.clone(), push, email));

        service
            .create(water_interruption(Some(AnnouncementStatus::Published)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn draft_is_silent_until_published() {
        let (store, _temp_dir) = create_test_store().await;
        let mut push = MockNotificationSender::new();
        push.expect_send().times(1).returning(|_| Ok(()));
        let service = service_with(
            store.clone(),
            dispatcher_with(store.clone(), push, MockEmailSender::new()),
        );

        let draft = service.create(water_interruption(None)).await.unwrap();
        assert_eq!(draft.status, AnnouncementStatus::Draft);
        assert_eq!(draft.published_on, None);

        let published = service.publish(&draft.id).await.unwrap();
        assert_eq!(published.status, AnnouncementStatus::Published);

        let unpublished = service.unpublish(&draft.id).await.unwrap();
        assert_eq!(unpublished.status, AnnouncementStatus::Draft);
        assert_eq!(unpublished.published_on, published.published_on);
        assert_eq!(
            service.get(&draft.id).await.unwrap().published_on,
            published.published_on
        );

        // Second publication does not notify again
        service.publish(&draft.id).await.unwrap();
    }

    #[tokio::test]
    async fn unpublish_requires_published() {
        let (service, _store, _temp_dir) = create_service().await;
        let draft = service.create(water_interruption(None)).await.unwrap();

        assert!(matches!(
            service.unpublish(&draft.id).await,
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn expire_overdue_only_touches_past_published() {
        let (service, _store, _temp_dir) = create_service().await;
        let today = local_today(philippine_time());

        let mut overdue = water_interruption(Some(AnnouncementStatus::Published));
        overdue.expires_on = Some(today - Duration::days(1));
        let overdue = service.create(overdue).await.unwrap();

        let mut current = water_interruption(Some(AnnouncementStatus::Published));
        current.expires_on = Some(today);
        let current = service.create(current).await.unwrap();

        let mut draft = water_interruption(None);
        draft.expires_on = Some(today - Duration::days(3));
        let draft = service.create(draft).await.unwrap();

        let expired = service.expire_overdue(today).await.unwrap();

        assert_eq!(expired, vec![overdue.id.clone()]);
        assert_eq!(
            service.get(&overdue.id).await.unwrap().status,
            AnnouncementStatus::Expired
        );
        assert_eq!(
            service.get(&current.id).await.unwrap().status,
            AnnouncementStatus::Published
        );
        assert_eq!(
            service.get(&draft.id).await.unwrap().status,
            AnnouncementStatus::Draft
        );
    }

    #[tokio::test]
    async fn visibility_filters_public_listing() {
        let (service, _store, _temp_dir) = create_service().await;
        service
            .create(water_interruption(Some(AnnouncementStatus::Published)))
            .await
            .unwrap();
        let mut residents_only = water_interruption(Some(AnnouncementStatus::Published));
        residents_only.visibility = Some(Visibility::Residents);
        service.create(residents_only).await.unwrap();
        service.create(water_interruption(None)).await.unwrap();

        assert_eq!(service.list_visible(false).await.unwrap().len(), 1);
        assert_eq!(service.list_visible(true).await.unwrap().len(), 2);
        assert_eq!(service.list_by_category("utilities").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (service, store, _temp_dir) = create_service().await;
        let created = service.create(water_interruption(None)).await.unwrap();

        let updated = service
            .update(
                &created.id,
                AnnouncementUpdate {
                    title: Some("Water interruption (rescheduled)".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.get(&created.id).await.unwrap(), updated);

        let entry = service.delete(&created.id, None).await.unwrap();
        assert_eq!(entry.preview["title"], "Water interruption (rescheduled)");
        assert_eq!(
            store
                .get(&format!("announcements/{}", created.id))
                .await
                .unwrap(),
            None
        );
    }
}
