pub mod analytics;
pub mod backend;
pub mod local;
pub mod session;

pub use crate::backend::{HostedBinding, StorageBackend};
pub use crate::session::{ClientSession, ClientSessionBuilder};
