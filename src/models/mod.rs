// src/models/mod.rs

pub mod course;
pub mod enrollment;
pub mod live_course;
pub mod session;
pub mod stats;
pub mod user;
