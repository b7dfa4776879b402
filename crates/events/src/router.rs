//! Event-to-notification routing.
//!
//! [`NotificationRouter`] subscribes to the event bus and, for every event
//! with recipients, stores an in-app notification per recipient and sends
//! an email when the event kind is emailed and SMTP is configured.

use std::sync::Arc;

use studiora_core::types::DbId;
use studiora_db::models::notification::CreateNotification;
use studiora_db::repositories::{NotificationRepo, UserRepo};
use studiora_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::content::{self, NotificationContent};
use crate::delivery::email::EmailDelivery;

pub struct NotificationRouter {
    pool: DbPool,
    email: Option<Arc<EmailDelivery>>,
}

impl NotificationRouter {
    pub fn new(pool: DbPool, email: Option<Arc<EmailDelivery>>) -> Self {
        Self { pool, email }
    }

    /// Run the routing loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one event to all of its recipients.
    pub async fn route_event(&self, event: &PlatformEvent) {
        let Some(content) = content::render(event) else {
            return;
        };

        for &user_id in &event.recipient_ids {
            // The actor never notifies themselves.
            if event.actor_user_id == Some(user_id) {
                continue;
            }
            if let Err(e) = self.deliver_in_app(user_id, &content).await {
                tracing::error!(
                    error = %e,
                    user_id,
                    event_type = %event.event_type,
                    "Failed to store notification"
                );
            }
            if content::is_emailed(&event.event_type) {
                self.deliver_email(user_id, &content).await;
            }
        }
    }

    async fn deliver_in_app(
        &self,
        user_id: DbId,
        content: &NotificationContent,
    ) -> Result<(), sqlx::Error> {
        NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id,
                kind: content.kind.clone(),
                title: content.title.clone(),
                body: content.body.clone(),
                link: content.link.clone(),
            },
        )
        .await?;
        Ok(())
    }

    /// Best-effort email; failures are logged and never block in-app delivery.
    async fn deliver_email(&self, user_id: DbId, content: &NotificationContent) {
        let Some(email) = &self.email else {
            return;
        };
        let user = match UserRepo::find_by_id(&self.pool, user_id).await {
            Ok(Some(user)) if user.is_active => user,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(error = %e, user_id, "Failed to load email recipient");
                return;
            }
        };
        if let Err(e) = email.deliver(&user.email, content).await {
            tracing::warn!(error = %e, user_id, kind = %content.kind, "Email delivery failed");
        }
    }
}
