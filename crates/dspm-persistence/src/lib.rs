//! Persistence-adapter trait boundary. The relational store itself is an
//! external collaborator; this crate only upserts the flat records the
//! pipeline emits.

pub mod account;
pub mod adapter;
pub mod error;
pub mod mock;
pub mod postgres;

pub use account::Account;
pub use adapter::PersistenceAdapter;
pub use error::PersistenceError;
pub use mock::MockPersistenceAdapter;
pub use postgres::PostgresPersistenceAdapter;
