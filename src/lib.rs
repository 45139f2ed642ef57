//! A minimal unsubscribe registry.
//!
//! API endpoints:
//! - `GET /`: unsubscribe form
//! - `GET /health_check`
//! - `POST /unsubscribe` (form: `email`, optional `site`)
//! - `GET /admin?token=..[&start=DD/MM/YYYY&end=DD/MM/YYYY][&download=1]`

pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod routes;
pub mod startup;
pub mod telemetry;
