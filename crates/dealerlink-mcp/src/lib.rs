//! Dealerlink MCP Server
//!
//! Model Context Protocol server that exposes dealer inventory operations
//! (vehicle lookup and editing, batch image upload, portal publishing) as
//! tools for AI agents.

pub mod server;
pub mod tools;

pub use dealerlink_api_client::ApiClient;
pub use server::DealerService;
