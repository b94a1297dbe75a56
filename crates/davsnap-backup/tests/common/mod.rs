//! Common test infrastructure for davsnap-backup integration tests
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `mock_dav`: wiremock helpers that imitate a WebDAV server

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_dav;

pub use mock_dav::*;
