//! docferry — relays Scribd documents into chat as PDF files.

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod pipeline;
pub mod resolve;
