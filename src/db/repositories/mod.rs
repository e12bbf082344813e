pub mod anomaly_repository;
pub mod attendance_repository;
pub mod employee_repository;
pub mod leave_repository;
pub mod settings_repository;
