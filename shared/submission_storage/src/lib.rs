//! Storage services for case submission delivery
//!
//! This crate provides the submission queue (producer side and the transport
//! used by the consumer) and the S3-backed attachment and document stores.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

pub mod bucket;
pub mod queue;
