//! Domain entities
//!
//! - `users` - User accounts, their criteria and filterable attributes

pub mod users;

pub use users::{User, UserCriteria};
