pub mod coins;
pub mod dates;
pub mod habit;
pub mod intention;
pub mod notifications;
pub mod reset;
pub mod service;
pub mod store;
pub mod streak;

pub use crate::service::{HabitService, HabitServiceBuilder};
