//! HTTP inbound adapter exposing REST endpoints.

pub mod analytics;
pub mod auth;
pub mod contact;
pub mod courses;
pub mod dto;
pub mod error;
pub mod health;
pub mod internships;
pub mod maintenance;
pub mod materials;
pub mod multipart;
pub mod notices;
pub mod notifications;
pub mod payments;
pub mod projects;
pub mod routes;
pub mod schemas;
pub mod state;
pub mod subjects;
pub mod subscriptions;
pub mod users;
pub mod validation;

pub use error::ApiResult;
