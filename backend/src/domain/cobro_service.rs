use anyhow::Result;
use chrono::NaiveDate;
use shared::{Cobro, CobroDetalle, FiltroCobros, NuevoCobro};
use tracing::info;

use crate::storage::connection::DbConnection;
use crate::storage::live::LiveQuery;
use crate::storage::repositories::CobroRepository;
use crate::storage::traits::CobroStorage;

#[derive(Debug, thiserror::Error)]
pub enum CobroValidationError {
    #[error("Amount charged must be positive")]
    MontoNoPositivo,
    #[error("Amount received must cover the amount charged")]
    RecibidoInsuficiente,
    #[error("Payment date must be a valid YYYY-MM-DD date")]
    FechaInvalida,
}

/// Service for payment CRUD.
///
/// The change owed (`vuelto`) is never taken from the caller: both create
/// and update recompute it from received minus charged, so the stored
/// value cannot drift from its inputs.
#[derive(Clone)]
pub struct CobroService {
    repository: CobroRepository,
}

impl CobroService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: CobroRepository::new(db),
        }
    }

    /// Validate and persist a new payment, returning it with the
    /// generated id and the computed change
    pub async fn create_cobro(&self, nuevo: NuevoCobro) -> Result<Cobro> {
        Self::validate(nuevo.monto_cobrado, nuevo.dinero_recibido, &nuevo.fecha_cobro)?;

        let mut cobro = Cobro {
            id_cobro: None,
            id_puesto: nuevo.id_puesto,
            monto_cobrado: nuevo.monto_cobrado,
            dinero_recibido: nuevo.dinero_recibido,
            vuelto: nuevo.dinero_recibido - nuevo.monto_cobrado,
            fecha_cobro: nuevo.fecha_cobro,
            latitud: nuevo.latitud,
            longitud: nuevo.longitud,
            id_usuario: nuevo.id_usuario,
        };

        let id = self.repository.store_cobro(&cobro).await?;
        cobro.id_cobro = Some(id);
        info!(
            "Recorded payment {} of {:.2} against stall {}",
            id, cobro.monto_cobrado, cobro.id_puesto
        );
        Ok(cobro)
    }

    /// Update a payment's amounts, stall, date, or GPS tag; the change
    /// owed is recomputed from the new amounts
    pub async fn update_cobro(&self, mut cobro: Cobro) -> Result<Cobro> {
        Self::validate(cobro.monto_cobrado, cobro.dinero_recibido, &cobro.fecha_cobro)?;

        cobro.vuelto = cobro.dinero_recibido - cobro.monto_cobrado;
        self.repository.update_cobro(&cobro).await?;
        Ok(cobro)
    }

    pub async fn delete_cobro(&self, id_cobro: i64) -> Result<()> {
        self.repository.delete_cobro(id_cobro).await
    }

    pub async fn get_cobro(&self, id_cobro: i64) -> Result<Option<Cobro>> {
        self.repository.get_cobro(id_cobro).await
    }

    pub async fn get_cobro_detalle(&self, id_cobro: i64) -> Result<Option<CobroDetalle>> {
        self.repository.get_cobro_detalle(id_cobro).await
    }

    pub async fn list_cobros(&self) -> Result<Vec<Cobro>> {
        self.repository.list_cobros().await
    }

    pub async fn search_cobros(&self, filtro: &FiltroCobros) -> Result<Vec<CobroDetalle>> {
        self.repository.search_cobros(filtro).await
    }

    pub fn watch_cobros(&self) -> LiveQuery<Cobro> {
        self.repository.watch_cobros()
    }

    pub fn watch_search(&self, filtro: FiltroCobros) -> LiveQuery<CobroDetalle> {
        self.repository.watch_search(filtro)
    }

    fn validate(monto_cobrado: f64, dinero_recibido: f64, fecha_cobro: &str) -> Result<()> {
        if monto_cobrado <= 0.0 {
            return Err(CobroValidationError::MontoNoPositivo.into());
        }
        if dinero_recibido < monto_cobrado {
            return Err(CobroValidationError::RecibidoInsuficiente.into());
        }
        // The query layer orders and range-filters dates lexicographically,
        // which is only sound for canonical zero-padded text. chrono parses
        // "2024-3-1" happily, so round-trip the parse to reject it.
        match NaiveDate::parse_from_str(fecha_cobro, "%Y-%m-%d") {
            Ok(parsed) if parsed.format("%Y-%m-%d").to_string() == fecha_cobro => Ok(()),
            _ => Err(CobroValidationError::FechaInvalida.into()),
        }
    }
}
