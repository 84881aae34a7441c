//! Transactional persistence for the commerce domain.
//!
//! [`CommerceStore`] is the entry point: it serves reads and opens
//! [`UnitOfWork`]s, each of which is one all-or-nothing transaction.
//! [`PostgresStore`] is the production backend and [`InMemoryStore`] a test
//! double with the same semantics.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use store::{CartStore, CommerceStore, UnitOfWork};
