//! Task persistence for the Miniban board.
//!
//! Tasks live either in an embedded SQLite file or in a hosted Postgres
//! service reached over its REST interface. [`open_repository`] picks one
//! from [`StoreConfig`] at startup; callers then work against the
//! [`TaskRepository`] trait and never see which backend they got.

mod cleanup;
mod config;
mod error;
mod record;
mod remote;
mod selector;
mod sqlite;
mod traits;

#[cfg(test)]
mod testing;

pub use cleanup::*;
pub use config::*;
pub use error::*;
pub use remote::*;
pub use selector::*;
pub use sqlite::*;
pub use traits::TaskRepository;
