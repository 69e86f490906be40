//! Scribe - Level Routing
//!
//! Pre-compiled level routing tables: which destinations receive a record of
//! a given severity.
//!
//! # Design
//!
//! Routing decisions are made once when the sink is built, not per record.
//! The `RouteTable` stores one route per configured rule. Each route pairs a
//! `LevelFilter` with the `WriterId`s of its destinations, so the hot path is
//! a handful of integer comparisons.
//!
//! # Modes
//!
//! | Mode | `all` rule | level rule `L` |
//! |------|------------|----------------|
//! | `duplicate` | `>= min_level` | `== L` |
//! | `above` | dropped | `>= L` |
//! | `exact` | dropped | `== L` |
//!
//! # Example
//!
//! ```
//! use scribe_routing::{RouteTableBuilder, RoutingMode, RoutingRule, Severity};
//!
//! let rules = vec![
//!     RoutingRule::new("all", ["logs/app.log"]),
//!     RoutingRule::new("error", ["logs/error.log"]),
//! ];
//!
//! let table = RouteTableBuilder::new()
//!     .build(&rules, RoutingMode::Duplicate, Severity::Info)
//!     .unwrap();
//!
//! // An error record lands in both files, an info record only in app.log
//! assert_eq!(table.routes_for(Severity::Error).count(), 2);
//! assert_eq!(table.routes_for(Severity::Info).count(), 1);
//! ```

mod error;
mod severity;
mod table;
mod writer_id;


pub use error::{Result, RoutingError};
pub use severity::{LevelKey, Severity};
pub use table::{LevelFilter, Route, RouteTable, RouteTableBuilder, RoutingMode, RoutingRule};
pub use writer_id::WriterId;
