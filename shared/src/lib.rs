use serde::{Deserialize, Serialize};

/// A collector/operator account. Created at registration, read during
/// authentication and when attributing payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    pub id_usuario: i64,
    pub nombre: String,
    pub apellido: String,
    /// Login handle, unique at the application layer (no DB constraint)
    pub usuario_login: String,
    /// Salted one-way hash, stored as "salt$digest" (never plaintext)
    pub contrasena_hash: String,
}

/// Registration payload. The plaintext password never reaches storage;
/// the user service hashes it before insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub apellido: String,
    pub usuario_login: String,
    pub contrasena: String,
}

/// A vendor who may own one or more stalls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comerciante {
    pub id_comerciante: i64,
    pub nombre_comerciante: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoComerciante {
    pub nombre_comerciante: String,
}

/// A numbered market space owned by exactly one merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puesto {
    pub id_puesto: i64,
    /// Unique across all stalls (case-insensitive at the service layer,
    /// case-sensitive unique index at storage)
    pub numero_puesto: String,
    pub id_comerciante: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoPuesto {
    pub numero_puesto: String,
    pub id_comerciante: i64,
}

/// A single fee-collection transaction against a stall, optionally
/// geotagged and attributed to a collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cobro {
    /// Absent until the row is persisted
    pub id_cobro: Option<i64>,
    pub id_puesto: i64,
    /// Amount charged, must be positive
    pub monto_cobrado: f64,
    /// Amount handed over, must be >= monto_cobrado
    pub dinero_recibido: f64,
    /// Change owed; always recomputed as recibido - cobrado on write
    pub vuelto: f64,
    /// Calendar date in fixed-width "YYYY-MM-DD" form, so lexicographic
    /// comparison is chronological comparison
    pub fecha_cobro: String,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    /// Collector who recorded the payment; nulled if that user is deleted
    pub id_usuario: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoCobro {
    pub id_puesto: i64,
    pub monto_cobrado: f64,
    pub dinero_recibido: f64,
    pub fecha_cobro: String,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub id_usuario: Option<i64>,
}

/// Filter for the payment search: collector, free-text (matched against
/// the stall number or merchant name), and an inclusive date window where
/// either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltroCobros {
    pub id_usuario: i64,
    pub texto: String,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

/// A stall joined to its merchant. The merchant is optional: the cascade
/// rules should never leave an orphan stall, but the shape tolerates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuestoConComerciante {
    pub puesto: Puesto,
    pub comerciante: Option<Comerciante>,
}

/// A payment joined to its stall-with-merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CobroDetalle {
    pub cobro: Cobro,
    pub puesto: Option<PuestoConComerciante>,
}

impl CobroDetalle {
    pub fn puesto(&self) -> Option<&Puesto> {
        self.puesto.as_ref().map(|p| &p.puesto)
    }

    pub fn comerciante(&self) -> Option<&Comerciante> {
        self.puesto.as_ref().and_then(|p| p.comerciante.as_ref())
    }

    pub fn numero_puesto(&self) -> Option<&str> {
        self.puesto().map(|p| p.numero_puesto.as_str())
    }

    pub fn nombre_comerciante(&self) -> Option<&str> {
        self.comerciante().map(|c| c.nombre_comerciante.as_str())
    }
}

/// A (label, summed amount) pair for charting; the label is either a
/// "YYYY-MM-DD" day or a "YYYY-MM" month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalDiario {
    pub etiqueta: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalPorPuesto {
    pub numero_puesto: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalPorComerciante {
    pub nombre_comerciante: String,
    pub total: f64,
}

/// Scalar aggregates for the dashboard, recomputed from scratch over the
/// full payment history on every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumenCobros {
    pub total_hoy: f64,
    pub total_semana: f64,
    pub total_mes: f64,
    pub total_general: f64,
    /// Grand total divided by the count of distinct payment dates;
    /// 0 when there are no payments
    pub promedio_diario: f64,
    /// Current month vs. the same month one year prior, as a percentage
    /// rounded to the nearest integer; 0 when the prior total is 0
    pub variacion_anual: i64,
}
