pub mod platform;
pub mod tables;
