//! Admin notification fan-out
//!
//! Qualifying platform events append one operator-facing notification each.
//! The messages are display-ready; the dashboard renders them verbatim.

use tracing::debug;

use crate::db::schemas::{NotificationDoc, NotificationKind, NOTIFICATION_COLLECTION};
use crate::db::store::{EntityStore, StoreError};

pub enum FanoutEvent<'a> {
    NoteUploaded {
        note_id: &'a str,
        uploader_name: &'a str,
        title: &'a str,
        subject: &'a str,
    },
    NoteReported {
        note_id: &'a str,
        reporter_name: &'a str,
        title: &'a str,
    },
    RequestPosted {
        request_id: &'a str,
        requester_name: &'a str,
        subject: &'a str,
    },
    ProfileSynced {
        user_id: &'a str,
        name: &'a str,
    },
}

impl FanoutEvent<'_> {
    fn into_notification(self) -> NotificationDoc {
        match self {
            FanoutEvent::NoteUploaded {
                note_id,
                uploader_name,
                title,
                subject,
            } => NotificationDoc::new(
                NotificationKind::NoteUpload,
                "New Note Uploaded",
                format!("{} uploaded \"{}\" for {}", uploader_name, title, subject),
                Some(note_id.to_string()),
            ),
            FanoutEvent::NoteReported {
                note_id,
                reporter_name,
                title,
            } => NotificationDoc::new(
                NotificationKind::Report,
                "Material Reported",
                format!("{} reported \"{}\" for review.", reporter_name, title),
                Some(note_id.to_string()),
            ),
            FanoutEvent::RequestPosted {
                request_id,
                requester_name,
                subject,
            } => NotificationDoc::new(
                NotificationKind::RequestPost,
                "New Note Request",
                format!("{} requested notes for {}", requester_name, subject),
                Some(request_id.to_string()),
            ),
            FanoutEvent::ProfileSynced { user_id, name } => NotificationDoc::new(
                NotificationKind::UserSignup,
                "Student Profile Sync",
                format!(
                    "{} profile updated.",
                    if name.is_empty() { "A student" } else { name }
                ),
                Some(user_id.to_string()),
            ),
        }
    }
}

pub async fn publish(
    store: &dyn EntityStore,
    event: FanoutEvent<'_>,
) -> Result<String, StoreError> {
    let notification = event.into_notification();
    let doc = bson::to_document(&notification).map_err(|e| StoreError::Encoding(e.to_string()))?;
    let id = store.append(NOTIFICATION_COLLECTION, doc).await?;
    debug!("Notification {} queued: {}", id, notification.title);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_message_names_uploader_title_and_subject() {
        let notification = FanoutEvent::NoteUploaded {
            note_id: "n1",
            uploader_name: "Ravi",
            title: "Signals Unit 3",
            subject: "Signals and Systems",
        }
        .into_notification();
        assert_eq!(notification.kind, NotificationKind::NoteUpload);
        assert_eq!(notification.title, "New Note Uploaded");
        assert_eq!(
            notification.message,
            "Ravi uploaded \"Signals Unit 3\" for Signals and Systems"
        );
        assert_eq!(notification.related_id.as_deref(), Some("n1"));
    }

    #[test]
    fn report_message_quotes_the_title() {
        let notification = FanoutEvent::NoteReported {
            note_id: "n1",
            reporter_name: "Meena",
            title: "Signals Unit 3",
        }
        .into_notification();
        assert_eq!(notification.kind, NotificationKind::Report);
        assert_eq!(
            notification.message,
            "Meena reported \"Signals Unit 3\" for review."
        );
    }

    #[test]
    fn request_message_names_the_subject() {
        let notification = FanoutEvent::RequestPosted {
            request_id: "r1",
            requester_name: "Meena",
            subject: "DBMS",
        }
        .into_notification();
        assert_eq!(notification.message, "Meena requested notes for DBMS");
    }

    #[test]
    fn profile_sync_falls_back_for_nameless_accounts() {
        let named = FanoutEvent::ProfileSynced {
            user_id: "u1",
            name: "Ravi",
        }
        .into_notification();
        assert_eq!(named.message, "Ravi profile updated.");

        let nameless = FanoutEvent::ProfileSynced {
            user_id: "u2",
            name: "",
        }
        .into_notification();
        assert_eq!(nameless.message, "A student profile updated.");
    }
}
