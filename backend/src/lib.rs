//! Local-first ledger for market-stall fee collection.
//!
//! Collectors record payments ("cobros") against stalls ("puestos") owned
//! by merchants ("comerciantes"). This crate is the data layer: the SQLite
//! schema and its referential-integrity rules, the repositories that
//! mediate every read and write, the live re-query machinery, and the
//! analytics builders that derive dashboard aggregates from the payment
//! history. Presentation and auth front-ends consume it as a library.

pub mod domain;
pub mod storage;

pub use storage::connection::DbConnection;
pub use storage::live::LiveQuery;
