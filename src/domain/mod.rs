//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains some of:
//! - `mod.rs`: Rich domain types (validated, business-logic-ready)
//! - `wire.rs`: Raw serde structs matching exchange payloads
//! - `convert.rs`: `From`/`TryFrom` conversions with validation
//! - `state.rs`: State containers with update methods (for WS-driven data)

pub mod balance;
pub mod notice;
pub mod order;
pub mod orderbook;
pub mod trade;
pub mod user;
