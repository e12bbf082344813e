pub mod anomaly;
pub mod attendance;
pub mod employee;
pub mod leave;
pub mod settings;
pub mod stats;
