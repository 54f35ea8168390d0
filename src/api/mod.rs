pub mod attendance;
pub mod history;
