//! url-parity - URL parity audit and remediation for site migrations.
//!
//! Compares the URL inventory of a production deployment with that of its
//! replacement, then decides what to do about every URL the replacement lost:
//! recreate it (recovering content from the live page), redirect it, de-index it or
//! leave it for manual review.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod extract;
pub mod inventory;
pub mod models;
pub mod parity;
pub mod pipeline;
pub mod report;
