use anyhow::Result;
use async_trait::async_trait;
use shared::{Cobro, CobroDetalle, Comerciante, FiltroCobros, Puesto, PuestoConComerciante};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::storage::connection::DbConnection;
use crate::storage::events::Table;
use crate::storage::live::LiveQuery;
use crate::storage::traits::CobroStorage;

/// Repository for payment operations
#[derive(Clone)]
pub struct CobroRepository {
    db: DbConnection,
}

fn row_to_cobro(row: &SqliteRow) -> Cobro {
    Cobro {
        id_cobro: Some(row.get("id_cobro")),
        id_puesto: row.get("id_puesto"),
        monto_cobrado: row.get("monto_cobrado"),
        dinero_recibido: row.get("dinero_recibido"),
        vuelto: row.get("vuelto"),
        fecha_cobro: row.get("fecha_cobro"),
        latitud: row.get("latitud"),
        longitud: row.get("longitud"),
        id_usuario: row.get("id_usuario"),
    }
}

/// Map a payment row double-left-joined to stall and merchant.
fn row_to_detalle(row: &SqliteRow) -> CobroDetalle {
    let puesto = row.get::<Option<i64>, _>("p_id_puesto").map(|id_puesto| {
        let comerciante = row
            .get::<Option<i64>, _>("c_id_comerciante")
            .map(|id_comerciante| Comerciante {
                id_comerciante,
                nombre_comerciante: row.get("nombre_comerciante"),
            });
        PuestoConComerciante {
            puesto: Puesto {
                id_puesto,
                numero_puesto: row.get("numero_puesto"),
                id_comerciante: row.get("p_id_comerciante"),
            },
            comerciante,
        }
    });

    CobroDetalle {
        cobro: row_to_cobro(row),
        puesto,
    }
}

const DETALLE_SELECT: &str = r#"
    SELECT co.id_cobro, co.id_puesto, co.monto_cobrado, co.dinero_recibido,
           co.vuelto, co.fecha_cobro, co.latitud, co.longitud, co.id_usuario,
           p.id_puesto AS p_id_puesto, p.numero_puesto,
           p.id_comerciante AS p_id_comerciante,
           c.id_comerciante AS c_id_comerciante, c.nombre_comerciante
    FROM cobros co
    LEFT JOIN puestos p ON co.id_puesto = p.id_puesto
    LEFT JOIN comerciantes c ON p.id_comerciante = c.id_comerciante
"#;

impl CobroRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Live view of all payments, newest first
    pub fn watch_cobros(&self) -> LiveQuery<Cobro> {
        let repo = self.clone();
        LiveQuery::new(self.db.subscribe(), &[Table::Cobros], move || {
            let repo = repo.clone();
            Box::pin(async move { repo.list_cobros().await })
        })
    }

    /// Live view of the filtered payment search. The join reads the
    /// stall and merchant tables, so their writes re-emit too.
    pub fn watch_search(&self, filtro: FiltroCobros) -> LiveQuery<CobroDetalle> {
        let repo = self.clone();
        LiveQuery::new(
            self.db.subscribe(),
            &[Table::Cobros, Table::Puestos, Table::Comerciantes],
            move || {
                let repo = repo.clone();
                let filtro = filtro.clone();
                Box::pin(async move { repo.search_cobros(&filtro).await })
            },
        )
    }
}

#[async_trait]
impl CobroStorage for CobroRepository {
    async fn store_cobro(&self, cobro: &Cobro) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO cobros (id_puesto, monto_cobrado, dinero_recibido, vuelto,
                                fecha_cobro, latitud, longitud, id_usuario)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cobro.id_puesto)
        .bind(cobro.monto_cobrado)
        .bind(cobro.dinero_recibido)
        .bind(cobro.vuelto)
        .bind(&cobro.fecha_cobro)
        .bind(cobro.latitud)
        .bind(cobro.longitud)
        .bind(cobro.id_usuario)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Cobros);
        Ok(result.last_insert_rowid())
    }

    async fn get_cobro(&self, id_cobro: i64) -> Result<Option<Cobro>> {
        let row = sqlx::query(
            r#"
            SELECT id_cobro, id_puesto, monto_cobrado, dinero_recibido, vuelto,
                   fecha_cobro, latitud, longitud, id_usuario
            FROM cobros
            WHERE id_cobro = ?
            "#,
        )
        .bind(id_cobro)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(row_to_cobro))
    }

    async fn get_cobro_detalle(&self, id_cobro: i64) -> Result<Option<CobroDetalle>> {
        let sql = format!("{} WHERE co.id_cobro = ?", DETALLE_SELECT);
        let row = sqlx::query(&sql)
            .bind(id_cobro)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(row_to_detalle))
    }

    async fn list_cobros(&self) -> Result<Vec<Cobro>> {
        let rows = sqlx::query(
            r#"
            SELECT id_cobro, id_puesto, monto_cobrado, dinero_recibido, vuelto,
                   fecha_cobro, latitud, longitud, id_usuario
            FROM cobros
            ORDER BY fecha_cobro DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(row_to_cobro).collect())
    }

    async fn search_cobros(&self, filtro: &FiltroCobros) -> Result<Vec<CobroDetalle>> {
        // Date bounds are inclusive; the fixed-width YYYY-MM-DD format
        // makes lexicographic comparison chronological
        let sql = format!(
            r#"{}
            WHERE co.id_usuario = ?
              AND (p.numero_puesto LIKE ? OR c.nombre_comerciante LIKE ?)
              AND (? IS NULL OR co.fecha_cobro >= ?)
              AND (? IS NULL OR co.fecha_cobro <= ?)
            ORDER BY co.fecha_cobro DESC
            "#,
            DETALLE_SELECT
        );
        let pattern = format!("%{}%", filtro.texto);

        let rows = sqlx::query(&sql)
            .bind(filtro.id_usuario)
            .bind(&pattern)
            .bind(&pattern)
            .bind(filtro.fecha_inicio.as_deref())
            .bind(filtro.fecha_inicio.as_deref())
            .bind(filtro.fecha_fin.as_deref())
            .bind(filtro.fecha_fin.as_deref())
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(row_to_detalle).collect())
    }

    async fn update_cobro(&self, cobro: &Cobro) -> Result<()> {
        let Some(id_cobro) = cobro.id_cobro else {
            anyhow::bail!("Cannot update a payment that was never persisted");
        };

        sqlx::query(
            r#"
            UPDATE cobros
            SET id_puesto = ?, monto_cobrado = ?, dinero_recibido = ?, vuelto = ?,
                fecha_cobro = ?, latitud = ?, longitud = ?, id_usuario = ?
            WHERE id_cobro = ?
            "#,
        )
        .bind(cobro.id_puesto)
        .bind(cobro.monto_cobrado)
        .bind(cobro.dinero_recibido)
        .bind(cobro.vuelto)
        .bind(&cobro.fecha_cobro)
        .bind(cobro.latitud)
        .bind(cobro.longitud)
        .bind(cobro.id_usuario)
        .bind(id_cobro)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Cobros);
        Ok(())
    }

    async fn delete_cobro(&self, id_cobro: i64) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM cobros WHERE id_cobro = ?
            "#,
        )
        .bind(id_cobro)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Cobros);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::{ComercianteRepository, PuestoRepository};
    use crate::storage::traits::{ComercianteStorage, PuestoStorage};
    use shared::{NuevoComerciante, NuevoPuesto};

    struct Fixture {
        cobros: CobroRepository,
        id_puesto: i64,
    }

    async fn setup_test() -> Fixture {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let comerciantes = ComercianteRepository::new(db.clone());
        let puestos = PuestoRepository::new(db.clone());

        let id_comerciante = comerciantes
            .store_comerciante(&NuevoComerciante {
                nombre_comerciante: "Ana".to_string(),
            })
            .await
            .unwrap();
        let id_puesto = puestos
            .store_puesto(&NuevoPuesto {
                numero_puesto: "A1".to_string(),
                id_comerciante,
            })
            .await
            .unwrap();

        Fixture {
            cobros: CobroRepository::new(db),
            id_puesto,
        }
    }

    fn cobro(id_puesto: i64, monto: f64, recibido: f64, fecha: &str, id_usuario: Option<i64>) -> Cobro {
        Cobro {
            id_cobro: None,
            id_puesto,
            monto_cobrado: monto,
            dinero_recibido: recibido,
            vuelto: recibido - monto,
            fecha_cobro: fecha.to_string(),
            latitud: None,
            longitud: None,
            id_usuario,
        }
    }

    #[tokio::test]
    async fn test_store_and_get_cobro() {
        let f = setup_test().await;
        let id = f
            .cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 15.0, "2024-03-01", None))
            .await
            .unwrap();

        let found = f.cobros.get_cobro(id).await.unwrap().unwrap();
        assert_eq!(found.id_cobro, Some(id));
        assert_eq!(found.vuelto, 5.0);
        assert_eq!(found.fecha_cobro, "2024-03-01");
    }

    #[tokio::test]
    async fn test_list_ordered_by_date_descending() {
        let f = setup_test().await;
        for fecha in ["2024-01-15", "2024-03-01", "2024-02-10"] {
            f.cobros
                .store_cobro(&cobro(f.id_puesto, 10.0, 10.0, fecha, None))
                .await
                .unwrap();
        }

        let all = f.cobros.list_cobros().await.unwrap();
        let fechas: Vec<&str> = all.iter().map(|c| c.fecha_cobro.as_str()).collect();
        assert_eq!(fechas, vec!["2024-03-01", "2024-02-10", "2024-01-15"]);
    }

    #[tokio::test]
    async fn test_get_cobro_detalle_joins_stall_and_merchant() {
        let f = setup_test().await;
        let id = f
            .cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 15.0, "2024-03-01", None))
            .await
            .unwrap();

        let detalle = f.cobros.get_cobro_detalle(id).await.unwrap().unwrap();
        assert_eq!(detalle.numero_puesto(), Some("A1"));
        assert_eq!(detalle.nombre_comerciante(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_search_filters_by_user() {
        let f = setup_test().await;
        // Users referenced by id_usuario must exist for the FK
        let db = f.cobros.db.clone();
        for login in ["maria", "jose"] {
            sqlx::query(
                "INSERT INTO usuarios (nombre, apellido, usuario_login, contrasena) VALUES (?, ?, ?, 'x')",
            )
            .bind(login)
            .bind(login)
            .bind(login)
            .execute(db.pool())
            .await
            .unwrap();
        }

        f.cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 10.0, "2024-03-01", Some(1)))
            .await
            .unwrap();
        f.cobros
            .store_cobro(&cobro(f.id_puesto, 20.0, 20.0, "2024-03-02", Some(2)))
            .await
            .unwrap();

        let hits = f
            .cobros
            .search_cobros(&FiltroCobros {
                id_usuario: 1,
                texto: String::new(),
                fecha_inicio: None,
                fecha_fin: None,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cobro.monto_cobrado, 10.0);
    }

    #[tokio::test]
    async fn test_search_date_bounds_are_inclusive() {
        let f = setup_test().await;
        let db = f.cobros.db.clone();
        sqlx::query(
            "INSERT INTO usuarios (nombre, apellido, usuario_login, contrasena) VALUES ('m', 'm', 'm', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        for fecha in ["2024-01-01", "2024-01-15", "2024-01-31", "2024-02-01"] {
            f.cobros
                .store_cobro(&cobro(f.id_puesto, 10.0, 10.0, fecha, Some(1)))
                .await
                .unwrap();
        }

        let hits = f
            .cobros
            .search_cobros(&FiltroCobros {
                id_usuario: 1,
                texto: String::new(),
                fecha_inicio: Some("2024-01-01".to_string()),
                fecha_fin: Some("2024-01-31".to_string()),
            })
            .await
            .unwrap();
        let fechas: Vec<&str> = hits.iter().map(|d| d.cobro.fecha_cobro.as_str()).collect();
        // Both boundary dates included, newest first
        assert_eq!(fechas, vec!["2024-01-31", "2024-01-15", "2024-01-01"]);
    }

    #[tokio::test]
    async fn test_search_open_bounds_and_stall_text() {
        let f = setup_test().await;
        let db = f.cobros.db.clone();
        sqlx::query(
            "INSERT INTO usuarios (nombre, apellido, usuario_login, contrasena) VALUES ('m', 'm', 'm', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        f.cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 10.0, "2024-03-01", Some(1)))
            .await
            .unwrap();

        // Open date bounds: everything for the user
        let todos = f
            .cobros
            .search_cobros(&FiltroCobros {
                id_usuario: 1,
                texto: String::new(),
                fecha_inicio: None,
                fecha_fin: None,
            })
            .await
            .unwrap();
        assert_eq!(todos.len(), 1);

        // Text matches the stall number, not the payment's own fields
        let por_puesto = f
            .cobros
            .search_cobros(&FiltroCobros {
                id_usuario: 1,
                texto: "a1".to_string(),
                fecha_inicio: None,
                fecha_fin: None,
            })
            .await
            .unwrap();
        assert_eq!(por_puesto.len(), 1);

        let sin_match = f
            .cobros
            .search_cobros(&FiltroCobros {
                id_usuario: 1,
                texto: "zzz".to_string(),
                fecha_inicio: None,
                fecha_fin: None,
            })
            .await
            .unwrap();
        assert!(sin_match.is_empty());
    }

    #[tokio::test]
    async fn test_update_cobro() {
        let f = setup_test().await;
        let id = f
            .cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 15.0, "2024-03-01", None))
            .await
            .unwrap();

        let mut updated = cobro(f.id_puesto, 12.0, 20.0, "2024-03-02", None);
        updated.id_cobro = Some(id);
        f.cobros.update_cobro(&updated).await.unwrap();

        let found = f.cobros.get_cobro(id).await.unwrap().unwrap();
        assert_eq!(found.monto_cobrado, 12.0);
        assert_eq!(found.vuelto, 8.0);
        assert_eq!(found.fecha_cobro, "2024-03-02");
    }

    #[tokio::test]
    async fn test_delete_missing_cobro_is_noop() {
        let f = setup_test().await;
        f.cobros.delete_cobro(123).await.expect("Delete of absent row must not fail");
    }

    #[tokio::test]
    async fn test_watch_search_reemits_on_merchant_write() {
        // The search joins through puestos and comerciantes, so writes to
        // either table must re-emit, not just payment writes
        let f = setup_test().await;
        let db = f.cobros.db.clone();
        let comerciantes = ComercianteRepository::new(db.clone());
        sqlx::query(
            "INSERT INTO usuarios (nombre, apellido, usuario_login, contrasena) VALUES ('m', 'm', 'm', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        f.cobros
            .store_cobro(&cobro(f.id_puesto, 10.0, 10.0, "2024-03-01", Some(1)))
            .await
            .unwrap();

        let mut live = f.cobros.watch_search(FiltroCobros {
            id_usuario: 1,
            texto: String::new(),
            fecha_inicio: None,
            fecha_fin: None,
        });
        let snapshot = live.snapshot().await.unwrap();
        assert_eq!(snapshot[0].nombre_comerciante(), Some("Ana"));

        comerciantes
            .update_comerciante(&shared::Comerciante {
                id_comerciante: 1,
                nombre_comerciante: "Ana Maria".to_string(),
            })
            .await
            .unwrap();
        let renamed = live.changed().await.unwrap();
        assert_eq!(renamed[0].nombre_comerciante(), Some("Ana Maria"));

        // A cascade delete of the merchant also reaches this query
        comerciantes.delete_comerciante(1).await.unwrap();
        let emptied = live.changed().await.unwrap();
        assert!(emptied.is_empty());
    }
}
