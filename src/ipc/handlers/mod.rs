pub mod core;
pub mod lessons;
pub mod schedules;
pub mod setup;
