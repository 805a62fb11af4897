//! # Storage Module
//!
//! Owns every persisted row. The schema, its referential-integrity rules
//! (CASCADE on merchant→stall→payment, SET NULL on payment→user, unique
//! stall numbers), the repositories that mediate all reads and writes,
//! and the live-query machinery that re-runs subscribed queries after
//! each write.
//!
//! Value-domain rules (positive amounts, received >= charged, non-blank
//! names, case-insensitive stall-number uniqueness) deliberately do NOT
//! live here; the domain services validate before calling in. This layer
//! enforces referential integrity only.

pub mod connection;
pub mod events;
pub mod live;
pub mod repositories;
pub mod traits;

pub use connection::DbConnection;
pub use events::Table;
pub use live::LiveQuery;
pub use repositories::{CobroRepository, ComercianteRepository, PuestoRepository, UsuarioRepository};
pub use traits::{CobroStorage, ComercianteStorage, PuestoStorage, UsuarioStorage};
