//! Radar Archive API Library
//!
//! Read-only HTTP access to the images published by the fetcher: time-range
//! listings per product and raw PNG downloads.

pub mod archive;
pub mod config;
pub mod handlers;
pub mod server;
pub mod state;

pub use archive::{Archive, ArchiveEntry};
pub use server::build_router;
pub use state::AppState;
