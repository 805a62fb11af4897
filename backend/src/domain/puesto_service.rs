use anyhow::Result;
use shared::{NuevoPuesto, Puesto, PuestoConComerciante};
use tracing::info;

use crate::storage::connection::DbConnection;
use crate::storage::live::LiveQuery;
use crate::storage::repositories::PuestoRepository;
use crate::storage::traits::PuestoStorage;

#[derive(Debug, thiserror::Error)]
pub enum PuestoValidationError {
    #[error("Stall number cannot be blank")]
    NumeroVacio,
    #[error("A stall with number '{0}' already exists")]
    NumeroDuplicado(String),
}

/// Service for stall CRUD.
///
/// Stall-number uniqueness is case-insensitive and enforced here, before
/// the write; the storage unique index only catches exact-case duplicates
/// and stays as a backstop.
#[derive(Clone)]
pub struct PuestoService {
    repository: PuestoRepository,
}

impl PuestoService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: PuestoRepository::new(db),
        }
    }

    pub async fn create_puesto(&self, nuevo: NuevoPuesto) -> Result<i64> {
        self.validate_numero(&nuevo.numero_puesto, None).await?;

        let id = self.repository.store_puesto(&nuevo).await?;
        info!("Created stall {} ({})", id, nuevo.numero_puesto);
        Ok(id)
    }

    pub async fn update_puesto(&self, puesto: Puesto) -> Result<()> {
        self.validate_numero(&puesto.numero_puesto, Some(puesto.id_puesto))
            .await?;

        self.repository.update_puesto(&puesto).await
    }

    /// Deletes the stall and every payment against it
    pub async fn delete_puesto(&self, id_puesto: i64) -> Result<()> {
        info!("Deleting stall {} with cascade", id_puesto);
        self.repository.delete_puesto(id_puesto).await
    }

    pub async fn get_puesto(&self, id_puesto: i64) -> Result<Option<Puesto>> {
        self.repository.get_puesto(id_puesto).await
    }

    pub async fn list_puestos(&self) -> Result<Vec<Puesto>> {
        self.repository.list_puestos().await
    }

    pub async fn list_puestos_con_comerciante(&self) -> Result<Vec<PuestoConComerciante>> {
        self.repository.list_puestos_con_comerciante().await
    }

    pub async fn search_puestos(&self, texto: &str) -> Result<Vec<PuestoConComerciante>> {
        self.repository.search_puestos(texto).await
    }

    pub fn watch_puestos(&self) -> LiveQuery<Puesto> {
        self.repository.watch_puestos()
    }

    pub fn watch_search(&self, texto: String) -> LiveQuery<PuestoConComerciante> {
        self.repository.watch_search(texto)
    }

    /// Case-insensitive duplicate check; `exclude` skips the row being
    /// updated so a stall can keep its own number
    async fn validate_numero(&self, numero: &str, exclude: Option<i64>) -> Result<()> {
        if numero.trim().is_empty() {
            return Err(PuestoValidationError::NumeroVacio.into());
        }

        if let Some(existing) = self.repository.get_puesto_by_numero_nocase(numero).await? {
            if Some(existing.id_puesto) != exclude {
                return Err(PuestoValidationError::NumeroDuplicado(numero.to_string()).into());
            }
        }

        Ok(())
    }
}
