//! Domain traits - Abstractions for infrastructure implementations

pub mod store;
pub mod transport;

pub use store::{AdminPersistence, RelationalStore, Row, SavedQuery, SavedQueryStore};
pub use transport::{KeyboardButton, Transport};
