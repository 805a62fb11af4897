use anyhow::Result;
use async_trait::async_trait;
use shared::{Comerciante, NuevoPuesto, Puesto, PuestoConComerciante};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::storage::connection::DbConnection;
use crate::storage::events::Table;
use crate::storage::live::LiveQuery;
use crate::storage::traits::PuestoStorage;

/// Repository for stall operations
#[derive(Clone)]
pub struct PuestoRepository {
    db: DbConnection,
}

/// Map a stall row left-joined to its merchant. The merchant columns are
/// NULL when the join found nothing.
fn row_to_puesto_con_comerciante(row: &SqliteRow) -> PuestoConComerciante {
    let comerciante = row
        .get::<Option<i64>, _>("c_id_comerciante")
        .map(|id_comerciante| Comerciante {
            id_comerciante,
            nombre_comerciante: row.get("nombre_comerciante"),
        });

    PuestoConComerciante {
        puesto: Puesto {
            id_puesto: row.get("id_puesto"),
            numero_puesto: row.get("numero_puesto"),
            id_comerciante: row.get("id_comerciante"),
        },
        comerciante,
    }
}

impl PuestoRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Live view of all stalls
    pub fn watch_puestos(&self) -> LiveQuery<Puesto> {
        let repo = self.clone();
        LiveQuery::new(self.db.subscribe(), &[Table::Puestos], move || {
            let repo = repo.clone();
            Box::pin(async move { repo.list_puestos().await })
        })
    }

    /// Live view of the stall search. Reads the merchant table through
    /// the join, so merchant writes re-emit as well.
    pub fn watch_search(&self, texto: String) -> LiveQuery<PuestoConComerciante> {
        let repo = self.clone();
        LiveQuery::new(
            self.db.subscribe(),
            &[Table::Puestos, Table::Comerciantes],
            move || {
                let repo = repo.clone();
                let texto = texto.clone();
                Box::pin(async move { repo.search_puestos(&texto).await })
            },
        )
    }
}

#[async_trait]
impl PuestoStorage for PuestoRepository {
    async fn store_puesto(&self, nuevo: &NuevoPuesto) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO puestos (numero_puesto, id_comerciante)
            VALUES (?, ?)
            "#,
        )
        .bind(&nuevo.numero_puesto)
        .bind(nuevo.id_comerciante)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Puestos);
        Ok(result.last_insert_rowid())
    }

    async fn get_puesto(&self, id_puesto: i64) -> Result<Option<Puesto>> {
        let row = sqlx::query(
            r#"
            SELECT id_puesto, numero_puesto, id_comerciante
            FROM puestos
            WHERE id_puesto = ?
            "#,
        )
        .bind(id_puesto)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Puesto {
            id_puesto: r.get("id_puesto"),
            numero_puesto: r.get("numero_puesto"),
            id_comerciante: r.get("id_comerciante"),
        }))
    }

    async fn get_puesto_by_numero_nocase(&self, numero_puesto: &str) -> Result<Option<Puesto>> {
        let row = sqlx::query(
            r#"
            SELECT id_puesto, numero_puesto, id_comerciante
            FROM puestos
            WHERE numero_puesto = ? COLLATE NOCASE
            "#,
        )
        .bind(numero_puesto)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Puesto {
            id_puesto: r.get("id_puesto"),
            numero_puesto: r.get("numero_puesto"),
            id_comerciante: r.get("id_comerciante"),
        }))
    }

    async fn list_puestos(&self) -> Result<Vec<Puesto>> {
        let rows = sqlx::query(
            r#"
            SELECT id_puesto, numero_puesto, id_comerciante
            FROM puestos
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let puestos = rows
            .iter()
            .map(|row| Puesto {
                id_puesto: row.get("id_puesto"),
                numero_puesto: row.get("numero_puesto"),
                id_comerciante: row.get("id_comerciante"),
            })
            .collect();

        Ok(puestos)
    }

    async fn list_puestos_con_comerciante(&self) -> Result<Vec<PuestoConComerciante>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id_puesto, p.numero_puesto, p.id_comerciante,
                   c.id_comerciante AS c_id_comerciante, c.nombre_comerciante
            FROM puestos p
            LEFT JOIN comerciantes c ON p.id_comerciante = c.id_comerciante
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(row_to_puesto_con_comerciante).collect())
    }

    async fn search_puestos(&self, texto: &str) -> Result<Vec<PuestoConComerciante>> {
        let pattern = format!("%{}%", texto);
        let rows = sqlx::query(
            r#"
            SELECT p.id_puesto, p.numero_puesto, p.id_comerciante,
                   c.id_comerciante AS c_id_comerciante, c.nombre_comerciante
            FROM puestos p
            LEFT JOIN comerciantes c ON p.id_comerciante = c.id_comerciante
            WHERE p.numero_puesto LIKE ?
               OR CAST(p.id_puesto AS TEXT) LIKE ?
               OR c.nombre_comerciante LIKE ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(row_to_puesto_con_comerciante).collect())
    }

    async fn update_puesto(&self, puesto: &Puesto) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE puestos
            SET numero_puesto = ?, id_comerciante = ?
            WHERE id_puesto = ?
            "#,
        )
        .bind(&puesto.numero_puesto)
        .bind(puesto.id_comerciante)
        .bind(puesto.id_puesto)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Puestos);
        Ok(())
    }

    async fn delete_puesto(&self, id_puesto: i64) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM puestos WHERE id_puesto = ?
            "#,
        )
        .bind(id_puesto)
        .execute(self.db.pool())
        .await?;

        // The delete cascades to the stall's payments
        self.db.notify(Table::Puestos);
        self.db.notify(Table::Cobros);
        Ok(())
    }
}
