//! Roster Module
//!
//! Classes and the students enrolled in them. Deleting a class is an
//! explicit multi-step operation: every student in it (and their avatar
//! file) goes first, then the class row itself.

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::{class_routes, student_routes};

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "roster_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
