pub mod collector;
pub mod error;
pub mod payload;
pub mod provider;
