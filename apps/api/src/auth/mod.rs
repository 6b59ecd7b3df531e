//! Accounts and the JWT token lifecycle: registration, login, refresh with
//! rotation, logout via blacklist, profile and password management.

pub mod blacklist;
pub mod extractor;
pub mod handlers;
pub mod password;
pub mod store;
pub mod tokens;
pub mod validation;
