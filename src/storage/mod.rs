//! Storage backends implementing the repository contract

pub mod csv;
pub mod json;
pub mod memory;
#[cfg(feature = "mongodb-backend")]
pub mod mongodb;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "rest")]
pub mod rest;

pub use csv::CsvFileRepo;
pub use json::JsonDirRepo;
pub use memory::MemoryRepo;
#[cfg(feature = "mongodb-backend")]
pub use mongodb::MongoRepo;
#[cfg(feature = "postgres")]
pub use postgres::SqlRepo;
#[cfg(feature = "rest")]
pub use rest::RestRepo;
