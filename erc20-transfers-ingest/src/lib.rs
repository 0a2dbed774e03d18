//! ERC-20 transfer ingestion CLI library.
//!
//! Resolves configuration, opens the selected storage backend and knows the
//! well-known token contracts the binary accepts by symbol.

pub mod backend;
pub mod config;
pub mod tokens;
