//! Inbound adapters for DigiDiploma clients.
//!
//! [`http`] serves the REST API consumed by the student and admin SPAs;
//! [`ws`] pushes in-app notifications to signed-in browsers.

pub mod http;
pub mod ws;
