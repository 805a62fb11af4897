use anyhow::Result;
use shared::{Comerciante, NuevoComerciante};
use tracing::info;

use crate::storage::connection::DbConnection;
use crate::storage::live::LiveQuery;
use crate::storage::repositories::ComercianteRepository;
use crate::storage::traits::ComercianteStorage;

#[derive(Debug, thiserror::Error)]
pub enum ComercianteValidationError {
    #[error("Merchant name cannot be blank")]
    NombreVacio,
}

/// Service for merchant CRUD with name validation
#[derive(Clone)]
pub struct ComercianteService {
    repository: ComercianteRepository,
}

impl ComercianteService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: ComercianteRepository::new(db),
        }
    }

    pub async fn create_comerciante(&self, nuevo: NuevoComerciante) -> Result<i64> {
        if nuevo.nombre_comerciante.trim().is_empty() {
            return Err(ComercianteValidationError::NombreVacio.into());
        }

        let id = self.repository.store_comerciante(&nuevo).await?;
        info!("Created merchant {} ({})", id, nuevo.nombre_comerciante);
        Ok(id)
    }

    pub async fn update_comerciante(&self, comerciante: Comerciante) -> Result<()> {
        if comerciante.nombre_comerciante.trim().is_empty() {
            return Err(ComercianteValidationError::NombreVacio.into());
        }

        self.repository.update_comerciante(&comerciante).await
    }

    /// Deletes the merchant, their stalls, and every payment against
    /// those stalls
    pub async fn delete_comerciante(&self, id_comerciante: i64) -> Result<()> {
        info!("Deleting merchant {} with cascade", id_comerciante);
        self.repository.delete_comerciante(id_comerciante).await
    }

    pub async fn get_comerciante(&self, id_comerciante: i64) -> Result<Option<Comerciante>> {
        self.repository.get_comerciante(id_comerciante).await
    }

    pub async fn list_comerciantes(&self) -> Result<Vec<Comerciante>> {
        self.repository.list_comerciantes().await
    }

    pub async fn search_comerciantes(&self, texto: &str) -> Result<Vec<Comerciante>> {
        self.repository.search_comerciantes(texto).await
    }

    pub fn watch_comerciantes(&self) -> LiveQuery<Comerciante> {
        self.repository.watch_comerciantes()
    }

    pub fn watch_search(&self, texto: String) -> LiveQuery<Comerciante> {
        self.repository.watch_search(texto)
    }
}
