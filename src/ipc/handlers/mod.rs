pub mod auth;
pub mod core;
pub mod dashboard;
pub mod roster;
pub mod scores;
pub mod setup;
pub mod students;
pub mod subjects;
