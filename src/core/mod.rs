//! Core abstraction: filters, cursors, the repository contract and errors

pub mod cursor;
pub mod error;
pub mod filter;
pub mod model;
pub mod oper;
pub mod repo;

pub use cursor::QueryCursor;
pub use error::{RepoError, RepoResult};
pub use filter::Filter;
pub use model::Model;
pub use oper::Oper;
pub use repo::{Repository, RepositoryExt};
