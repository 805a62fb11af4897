//! # Storage Traits
//!
//! Interfaces the domain layer works against, so the SQLite backend can
//! be swapped without touching the services.

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    Cobro, CobroDetalle, Comerciante, FiltroCobros, NuevoComerciante, NuevoPuesto, Puesto,
    PuestoConComerciante, Usuario,
};

/// Interface for collector account storage.
///
/// Accounts are created at registration and read during authentication;
/// no operation updates them. Deletion exists only to detach a collector
/// from history: their payments survive with `id_usuario` nulled.
#[async_trait]
pub trait UsuarioStorage: Send + Sync {
    /// Store a new user with an already-hashed credential, returning the
    /// generated id
    async fn store_usuario(&self, usuario: &Usuario) -> Result<i64>;

    /// Retrieve a specific user by ID
    async fn get_usuario(&self, id_usuario: i64) -> Result<Option<Usuario>>;

    /// Retrieve a user by login handle (authentication and the
    /// application-layer uniqueness check)
    async fn get_usuario_by_login(&self, usuario_login: &str) -> Result<Option<Usuario>>;

    /// Delete a user by ID; their payments keep the row but lose the
    /// attribution (SET NULL). Deleting a nonexistent user is a no-op.
    async fn delete_usuario(&self, id_usuario: i64) -> Result<()>;
}

/// Interface for merchant storage operations.
#[async_trait]
pub trait ComercianteStorage: Send + Sync {
    /// Store a new merchant, returning the generated id
    async fn store_comerciante(&self, nuevo: &NuevoComerciante) -> Result<i64>;

    /// Retrieve a specific merchant by ID
    async fn get_comerciante(&self, id_comerciante: i64) -> Result<Option<Comerciante>>;

    /// List all merchants ordered by name ascending
    async fn list_comerciantes(&self) -> Result<Vec<Comerciante>>;

    /// Case-insensitive substring search against merchant name or
    /// id-as-text, ordered by name
    async fn search_comerciantes(&self, texto: &str) -> Result<Vec<Comerciante>>;

    /// Update an existing merchant by primary key
    async fn update_comerciante(&self, comerciante: &Comerciante) -> Result<()>;

    /// Delete a merchant by ID, cascading to its stalls and transitively
    /// to their payments. Deleting a nonexistent merchant is a no-op.
    async fn delete_comerciante(&self, id_comerciante: i64) -> Result<()>;
}

/// Interface for stall storage operations.
#[async_trait]
pub trait PuestoStorage: Send + Sync {
    /// Store a new stall, returning the generated id. Fails on an
    /// exact-case duplicate stall number (unique index).
    async fn store_puesto(&self, nuevo: &NuevoPuesto) -> Result<i64>;

    /// Retrieve a specific stall by ID
    async fn get_puesto(&self, id_puesto: i64) -> Result<Option<Puesto>>;

    /// Case-insensitive point lookup by stall number, used by callers to
    /// pre-check duplicates the case-sensitive index would let through
    async fn get_puesto_by_numero_nocase(&self, numero_puesto: &str) -> Result<Option<Puesto>>;

    /// List all stalls, unordered
    async fn list_puestos(&self) -> Result<Vec<Puesto>>;

    /// List all stalls joined to their (possibly absent) merchant
    async fn list_puestos_con_comerciante(&self) -> Result<Vec<PuestoConComerciante>>;

    /// Case-insensitive substring search against stall number, stall id,
    /// or merchant name. An empty filter matches everything.
    async fn search_puestos(&self, texto: &str) -> Result<Vec<PuestoConComerciante>>;

    /// Update an existing stall by primary key
    async fn update_puesto(&self, puesto: &Puesto) -> Result<()>;

    /// Delete a stall by ID, cascading to its payments. Deleting a
    /// nonexistent stall is a no-op.
    async fn delete_puesto(&self, id_puesto: i64) -> Result<()>;
}

/// Interface for payment storage operations.
#[async_trait]
pub trait CobroStorage: Send + Sync {
    /// Store a new payment, returning the generated id
    async fn store_cobro(&self, cobro: &Cobro) -> Result<i64>;

    /// Retrieve a specific payment by ID
    async fn get_cobro(&self, id_cobro: i64) -> Result<Option<Cobro>>;

    /// Single-row join fetch of a payment with its stall and merchant
    async fn get_cobro_detalle(&self, id_cobro: i64) -> Result<Option<CobroDetalle>>;

    /// List all payments ordered by date descending
    async fn list_cobros(&self) -> Result<Vec<Cobro>>;

    /// Filtered search over one collector's payments: optional inclusive
    /// date bounds (lexicographic on the fixed-width date strings) and a
    /// substring match against the stall number or merchant name.
    /// Ordered by date descending.
    async fn search_cobros(&self, filtro: &FiltroCobros) -> Result<Vec<CobroDetalle>>;

    /// Update an existing payment by primary key
    async fn update_cobro(&self, cobro: &Cobro) -> Result<()>;

    /// Delete a payment by ID; a no-op when absent
    async fn delete_cobro(&self, id_cobro: i64) -> Result<()>;
}
