//! Charla core library — chat session lifecycle, backend client, persistence,
//! and configuration shared by the CLI front end.

pub mod backend;
pub mod config;
pub mod init;
pub mod lang;
pub mod session;
pub mod store;
pub mod token;
