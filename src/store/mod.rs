//! In-memory result store: schema and bulk-loaded SQL access.

mod db;
mod schema;

pub use db::{ConstructorStanding, InMemoryDb};
