//! Tubely Database Library
//!
//! Postgres repositories for Tubely records.

pub mod db;

pub use db::VideoRepository;
