pub mod attendance;
pub mod history;
pub mod role;
pub mod user;
