//! # Domain Module
//!
//! Business rules above the storage layer.
//!
//! The storage engine enforces referential integrity only; every
//! value-domain rule lives here and runs before a repository write:
//!
//! - Payments: amount charged must be positive, amount received must
//!   cover it, and the change owed is recomputed from its inputs on
//!   every create and update.
//! - Stalls: stall numbers are unique case-insensitively, checked here
//!   because the storage index is case-sensitive and narrower.
//! - Merchants and users: required names must not be blank; login
//!   handles are unique at this layer (no database constraint).
//!
//! Validation failures are typed errors so callers can present them;
//! storage failures propagate untouched, with no retry and no
//! suppression.

pub mod analytics;
pub mod cobro_service;
pub mod comerciante_service;
pub mod puesto_service;
pub mod usuario_service;

pub use cobro_service::{CobroService, CobroValidationError};
pub use comerciante_service::{ComercianteService, ComercianteValidationError};
pub use puesto_service::{PuestoService, PuestoValidationError};
pub use usuario_service::{UsuarioService, UsuarioValidationError};
