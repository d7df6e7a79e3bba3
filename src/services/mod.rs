//! Business operations. Handlers stay thin and call into these.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod catalog;
