// wikiask - ask questions answered by a hosted model with MCP tools
// Library exports

pub mod agent;
pub mod cli;
pub mod config;
pub mod logging;
pub mod providers;
pub mod tools;
