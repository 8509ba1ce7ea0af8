//! Library Module
//!
//! Book inventory plus the borrow ledger and the rules tying them together:
//! lending decrements a book's available-copies count atomically with the
//! ledger insert, returning closes the record and restores the count, and a
//! student can hold at most one open record per book. The module also derives
//! the read-only views over the ledger (unreturned list, per-book history,
//! the book × student report).
//!
//! # Usage
//!
//! ```rust,ignore
//! use libris::library;
//!
//! // Mount the routes
//! let app = Router::new()
//!     .nest("/api/library", library::routes())
//!     .with_state(app_state);
//!
//! // Use the library directly
//! let lib = library::Library::new(&db);
//! lib.lend(request).await?;
//! ```

mod handler;
mod lib;
mod routes;

pub mod report;

// Re-export the core library types and functions
pub use lib::*;

// Re-export the routes function
pub use routes::routes;

/// Returns the migrations for the library module.
///
/// These should be run during application startup, after the roster
/// migrations (the ledger references students).
pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "library_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
