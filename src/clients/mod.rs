//! Clients - HTTP Clients for External APIs
//!
//! This module contains the client for the bin priority feed.

pub mod priority_feed;

pub use priority_feed::{HttpPriorityFeed, PriorityFeed, StaticPriorityFeed};
