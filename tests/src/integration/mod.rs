//! # Cross-Chain Integration Flows
//!
//! Each flow starts a fresh devnet, dispatches from one router and relays
//! packets until both networks are quiet.

pub mod governance;
pub mod lifecycle;
pub mod transports;
