use anyhow::Result;
use async_trait::async_trait;
use shared::{Comerciante, NuevoComerciante};
use sqlx::Row;

use crate::storage::connection::DbConnection;
use crate::storage::events::Table;
use crate::storage::live::LiveQuery;
use crate::storage::traits::ComercianteStorage;

/// Repository for merchant operations
#[derive(Clone)]
pub struct ComercianteRepository {
    db: DbConnection,
}

impl ComercianteRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Live view of all merchants, name ascending
    pub fn watch_comerciantes(&self) -> LiveQuery<Comerciante> {
        let repo = self.clone();
        LiveQuery::new(self.db.subscribe(), &[Table::Comerciantes], move || {
            let repo = repo.clone();
            Box::pin(async move { repo.list_comerciantes().await })
        })
    }

    /// Live view of the merchant search for a fixed filter. A new filter
    /// means a new live query.
    pub fn watch_search(&self, texto: String) -> LiveQuery<Comerciante> {
        let repo = self.clone();
        LiveQuery::new(self.db.subscribe(), &[Table::Comerciantes], move || {
            let repo = repo.clone();
            let texto = texto.clone();
            Box::pin(async move { repo.search_comerciantes(&texto).await })
        })
    }
}

#[async_trait]
impl ComercianteStorage for ComercianteRepository {
    async fn store_comerciante(&self, nuevo: &NuevoComerciante) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO comerciantes (nombre_comerciante)
            VALUES (?)
            "#,
        )
        .bind(&nuevo.nombre_comerciante)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Comerciantes);
        Ok(result.last_insert_rowid())
    }

    async fn get_comerciante(&self, id_comerciante: i64) -> Result<Option<Comerciante>> {
        let row = sqlx::query(
            r#"
            SELECT id_comerciante, nombre_comerciante
            FROM comerciantes
            WHERE id_comerciante = ?
            "#,
        )
        .bind(id_comerciante)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| Comerciante {
            id_comerciante: r.get("id_comerciante"),
            nombre_comerciante: r.get("nombre_comerciante"),
        }))
    }

    async fn list_comerciantes(&self) -> Result<Vec<Comerciante>> {
        let rows = sqlx::query(
            r#"
            SELECT id_comerciante, nombre_comerciante
            FROM comerciantes
            ORDER BY nombre_comerciante ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let comerciantes = rows
            .iter()
            .map(|row| Comerciante {
                id_comerciante: row.get("id_comerciante"),
                nombre_comerciante: row.get("nombre_comerciante"),
            })
            .collect();

        Ok(comerciantes)
    }

    async fn search_comerciantes(&self, texto: &str) -> Result<Vec<Comerciante>> {
        let pattern = format!("%{}%", texto);
        let rows = sqlx::query(
            r#"
            SELECT id_comerciante, nombre_comerciante
            FROM comerciantes
            WHERE nombre_comerciante LIKE ?
               OR CAST(id_comerciante AS TEXT) LIKE ?
            ORDER BY nombre_comerciante ASC
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(self.db.pool())
        .await?;

        let comerciantes = rows
            .iter()
            .map(|row| Comerciante {
                id_comerciante: row.get("id_comerciante"),
                nombre_comerciante: row.get("nombre_comerciante"),
            })
            .collect();

        Ok(comerciantes)
    }

    async fn update_comerciante(&self, comerciante: &Comerciante) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE comerciantes
            SET nombre_comerciante = ?
            WHERE id_comerciante = ?
            "#,
        )
        .bind(&comerciante.nombre_comerciante)
        .bind(comerciante.id_comerciante)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Comerciantes);
        Ok(())
    }

    async fn delete_comerciante(&self, id_comerciante: i64) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM comerciantes WHERE id_comerciante = ?
            "#,
        )
        .bind(id_comerciante)
        .execute(self.db.pool())
        .await?;

        // The delete cascades to the merchant's stalls and their payments
        self.db.notify(Table::Comerciantes);
        self.db.notify(Table::Puestos);
        self.db.notify(Table::Cobros);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::{CobroRepository, PuestoRepository};
    use crate::storage::traits::{CobroStorage, PuestoStorage};
    use shared::{Cobro, NuevoPuesto};

    async fn setup_test() -> (ComercianteRepository, DbConnection) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        (ComercianteRepository::new(db.clone()), db)
    }

    async fn store_named(repo: &ComercianteRepository, nombre: &str) -> i64 {
        repo.store_comerciante(&NuevoComerciante {
            nombre_comerciante: nombre.to_string(),
        })
        .await
        .expect("Failed to store merchant")
    }

    #[tokio::test]
    async fn test_store_and_get_comerciante() {
        let (repo, _db) = setup_test().await;

        let id = store_named(&repo, "Ana").await;
        assert_eq!(id, 1);

        let found = repo.get_comerciante(id).await.unwrap();
        assert_eq!(
            found,
            Some(Comerciante {
                id_comerciante: 1,
                nombre_comerciante: "Ana".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_get_missing_comerciante_is_none() {
        let (repo, _db) = setup_test().await;
        assert!(repo.get_comerciante(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let (repo, _db) = setup_test().await;
        store_named(&repo, "Zoila").await;
        store_named(&repo, "Ana").await;
        store_named(&repo, "Mario").await;

        let all = repo.list_comerciantes().await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.nombre_comerciante.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Mario", "Zoila"]);
    }

    #[tokio::test]
    async fn test_search_by_name_substring_case_insensitive() {
        let (repo, _db) = setup_test().await;
        store_named(&repo, "Maria Lopez").await;
        store_named(&repo, "Mario Paz").await;
        store_named(&repo, "Ana").await;

        let hits = repo.search_comerciantes("mari").await.unwrap();
        let names: Vec<&str> = hits.iter().map(|c| c.nombre_comerciante.as_str()).collect();
        assert_eq!(names, vec!["Maria Lopez", "Mario Paz"]);
    }

    #[tokio::test]
    async fn test_search_by_id_as_text() {
        let (repo, _db) = setup_test().await;
        let id = store_named(&repo, "Ana").await;
        store_named(&repo, "Mario").await;

        let hits = repo.search_comerciantes(&id.to_string()).await.unwrap();
        assert!(hits.iter().any(|c| c.id_comerciante == id));
    }

    #[tokio::test]
    async fn test_update_comerciante() {
        let (repo, _db) = setup_test().await;
        let id = store_named(&repo, "Ana").await;

        repo.update_comerciante(&Comerciante {
            id_comerciante: id,
            nombre_comerciante: "Ana Maria".to_string(),
        })
        .await
        .unwrap();

        let found = repo.get_comerciante(id).await.unwrap().unwrap();
        assert_eq!(found.nombre_comerciante, "Ana Maria");
    }

    #[tokio::test]
    async fn test_delete_missing_comerciante_is_noop() {
        let (repo, _db) = setup_test().await;
        repo.delete_comerciante(99).await.expect("Delete of absent row must not fail");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_puestos_and_cobros() {
        let (repo, db) = setup_test().await;
        let puestos = PuestoRepository::new(db.clone());
        let cobros = CobroRepository::new(db.clone());

        let id_comerciante = store_named(&repo, "Ana").await;
        let id_puesto = puestos
            .store_puesto(&NuevoPuesto {
                numero_puesto: "A1".to_string(),
                id_comerciante,
            })
            .await
            .unwrap();
        cobros
            .store_cobro(&Cobro {
                id_cobro: None,
                id_puesto,
                monto_cobrado: 10.0,
                dinero_recibido: 15.0,
                vuelto: 5.0,
                fecha_cobro: "2024-03-01".to_string(),
                latitud: None,
                longitud: None,
                id_usuario: None,
            })
            .await
            .unwrap();

        repo.delete_comerciante(id_comerciante).await.unwrap();

        assert!(puestos.get_puesto(id_puesto).await.unwrap().is_none());
        assert!(cobros.list_cobros().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_comerciantes_reemits_on_store() {
        let (repo, _db) = setup_test().await;
        let mut live = repo.watch_comerciantes();

        assert!(live.snapshot().await.unwrap().is_empty());

        store_named(&repo, "Ana").await;
        let updated = live.changed().await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].nombre_comerciante, "Ana");
    }
}
