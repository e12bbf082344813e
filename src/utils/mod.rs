pub mod clock;
pub mod geo;
pub mod logger;
pub mod time;
