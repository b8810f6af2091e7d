pub mod auth;
pub mod common;
pub mod deployments;
pub mod health;
pub mod repos;
