//! Credential handling
//!
//! The gateway hashes passwords before they leave the process; checking
//! credentials is the identity service's job.

pub mod password;

pub use password::hash_password;
