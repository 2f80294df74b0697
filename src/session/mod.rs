//! Sessions and request-scoped context

pub mod context;
pub mod store;

pub use context::{CancelOnDrop, CancelToken, IdentityContext, RequestContext, CURRENT_IDENTITY_KEY};
pub use store::{spawn_cleanup_task, Session, SessionStore, SessionStoreStats};
