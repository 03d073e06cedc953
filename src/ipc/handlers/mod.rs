pub mod attendance;
pub mod backup;
pub mod calc;
pub mod core;
pub mod friend;
pub mod settings;
pub mod tasks;
