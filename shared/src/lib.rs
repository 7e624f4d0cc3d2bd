//! Wire types shared between the meeting service and its clients.

pub mod api;
pub mod models;
pub mod time;

pub use models::Meeting;
pub use time::Timestamp;
