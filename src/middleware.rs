// src/middleware.rs

pub mod identity;
