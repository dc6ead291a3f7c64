//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Chat management commands for admins
pub mod admin;

/// General utility commands
pub mod general;

/// Profile commands available to everyone
pub mod profile;

// Export commands
pub use admin::*;
pub use general::*;
pub use profile::*;
