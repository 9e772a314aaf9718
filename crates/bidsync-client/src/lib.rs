//! Bidsync Client - HTTP client for the bidding platform identity API
//!
//! - [`identity`] - creates contact logins and assigns their role
//!
//! The client implements [`bidsync_core::CredentialProvisioner`] and handles
//! authentication, request building, response parsing and retries on
//! transient failures.

pub mod identity;

pub use identity::IdentityClient;
