// src/utils/mod.rs

pub mod hash;
pub mod html;
pub mod meeting;
pub mod session;
pub mod upload;
