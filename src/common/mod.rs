pub mod events;
pub mod routes;
pub mod types;

pub use events::{ChatEvent, Rollback};
pub use routes::Route;
pub use types::{Message, Role, Session};
