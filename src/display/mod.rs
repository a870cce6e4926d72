//! Plain-text renderings of a snapshot for logs and terminals.
pub mod trace;
