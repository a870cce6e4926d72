//! Invariant checks over node tables and their branch index.
//!
//! Acts like a linter for a snapshot: it never mutates anything and reports
//! every violation at once.
pub use self::error::{ValidationError, ValidationErrorType};
pub use self::validator::Validator;

mod error;
mod validator;
mod rules {
    pub mod tree;
    pub mod values;
}
