pub mod error;
pub mod reading_store;
