//! Core types, workflow rules, and trait definitions for OSAS Connect.
//!
//! This crate is deliberately free of HTTP and database dependencies. Every
//! rule that decides whether a state change is legal lives here as a pure
//! function; storage backends call into it inside their transactions.

pub mod application;
pub mod assistantship;
pub mod document;
pub mod error;
pub mod interview;
pub mod ledger;
pub mod money;
pub mod notification;
pub mod renewal;
pub mod scholarship;
pub mod storage;
pub mod store;
pub mod user;

pub use error::{Error, Result};
