//! AI Council Library
//!
//! This library provides the core functionality for an AI council widget
//! application with MCP (Model Context Protocol) support: a consultation
//! pipeline that calls a chat-completion endpoint, normalizes its payload
//! into a strict three-member council shape, and falls back to canned
//! content on any failure.

// Domain modules
pub mod council;
pub mod mcp;

// Infrastructure
pub mod router;
