//! Desktop chat client: email/password sign-in, per-user chat history in a
//! document store, and single-turn replies from a hosted completion API.

pub mod chat;
pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod session;
pub mod storage;
pub mod ui;
