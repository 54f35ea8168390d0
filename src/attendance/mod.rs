pub mod actions;
pub mod calendar;
pub mod day_key;
pub mod store;
pub mod summary;
