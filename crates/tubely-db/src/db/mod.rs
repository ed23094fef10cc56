//! Database repositories for the data access layer
//!
//! Each repository owns a connection pool handle and exposes the queries for
//! one table.

pub mod video;

pub use video::VideoRepository;
