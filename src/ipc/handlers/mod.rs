pub mod auth;
pub mod catalog;
pub mod core;
pub mod courses;
pub mod grades;
pub mod groups;
pub mod rooms;
pub mod schedule;
pub mod students;
pub mod teachers;
