//! Infrastructure layer: concrete storage backends.
//!
//! - [`persistence`] - PostgreSQL, MySQL, SQLite and MongoDB implementations
//!   of the domain traits

pub mod persistence;
