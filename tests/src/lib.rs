//! # Bridge Router Test Suite
//!
//! Cross-chain flows driven over the in-process devnet.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs       # Devnet start-up and paid request helpers
//! │   └── integration/      # End-to-end flows across routers
//! │       ├── lifecycle.rs  # PENDING → DELIVERED → COMPLETED | FAILED
//! │       ├── transports.rs # Stargate, CCIP, out-of-order and replayed packets
//! │       └── governance.rs # Pause gating, registry changes, id uniqueness
//! └── benches/
//!     └── router_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bridge-tests
//!
//! # By category
//! cargo test -p bridge-tests integration::lifecycle
//! cargo test -p bridge-tests integration::transports
//!
//! # Persistent stores
//! cargo test -p bridge-tests --features rocksdb
//!
//! # Benchmarks
//! cargo bench -p bridge-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
