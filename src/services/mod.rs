pub mod aggregation;
pub mod alert_dispatcher;
pub mod anomaly_detector;
pub mod anomaly_service;
pub mod attendance_service;
pub mod employee_service;
pub mod leave_conflict;
pub mod leave_service;
pub mod notification_service;
pub mod reminder_service;
pub mod settings_service;
pub mod statistics;
pub mod stats_service;
