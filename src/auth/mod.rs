//! Auth Module
//!
//! JWT sign-in for admins and the cookie-based guard on the API. Tokens are
//! stateless; admin accounts live in the `admins` table with bcrypt-hashed
//! passwords, and a default account is provisioned from configuration when
//! the table is empty.

mod handler;
mod lib;

pub use lib::*;

pub use handler::{LoginRequest, authenticate, require_auth, sign_in};

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "auth_001_admins.sql",
        include_str!("migrations/001_admins.sql"),
    )]
}
