pub mod location;
pub mod metric;
pub mod reading;
