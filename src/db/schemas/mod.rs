//! Stored document shapes, one module per collection

mod audit;
mod note;
mod notification;
mod request;
mod user;

pub use audit::{AuditCategory, AuditLogDoc, AUDIT_LOG_COLLECTION};
pub use note::{NoteDoc, NoteStatus, NOTE_COLLECTION};
pub use notification::{NotificationDoc, NotificationKind, NOTIFICATION_COLLECTION};
pub use request::{RequestDoc, RequestStatus, REQUEST_COLLECTION};
pub use user::{Badge, Role, UserDoc, UserStatus, USER_COLLECTION};
