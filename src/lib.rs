//! # backoffice
//!
//! Session authentication and route authorization for the E2E Burguer
//! restaurant back office.
//!
//! The crate sits between the browser and the external REST backend. It owns
//! the session token lifecycle (store, decode, hydrate, clear), the sign-in /
//! sign-up / sign-out flows, and the guards that gate each back-office page's
//! data loading. The `backoffice` binary serves those pages over axum; the
//! `backoffice-cli` crate drives the same session manager from a terminal.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
