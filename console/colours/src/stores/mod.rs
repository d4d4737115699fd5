//! Reactive state shared by every surface of the console.
//!
//! Each store is a cheap `Clone` handle over shared state. Readers take
//! immutable snapshots or subscribe to changes; only the store's own
//! operations write.

pub mod guild;
pub mod notification;
pub mod session;

pub use self::guild::{ColourCreate, ColourUpdate, GuildStore, GuildUpdate};
pub use self::notification::{Notification, NotificationKind, NotificationStore};
pub use self::session::{AuthState, Session, SessionStore};
