use anyhow::Result;
use async_trait::async_trait;
use shared::Usuario;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::storage::connection::DbConnection;
use crate::storage::events::Table;
use crate::storage::traits::UsuarioStorage;

/// Repository for collector account operations
#[derive(Clone)]
pub struct UsuarioRepository {
    db: DbConnection,
}

fn row_to_usuario(row: &SqliteRow) -> Usuario {
    Usuario {
        id_usuario: row.get("id_usuario"),
        nombre: row.get("nombre"),
        apellido: row.get("apellido"),
        usuario_login: row.get("usuario_login"),
        contrasena_hash: row.get("contrasena"),
    }
}

impl UsuarioRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsuarioStorage for UsuarioRepository {
    async fn store_usuario(&self, usuario: &Usuario) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO usuarios (nombre, apellido, usuario_login, contrasena)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&usuario.nombre)
        .bind(&usuario.apellido)
        .bind(&usuario.usuario_login)
        .bind(&usuario.contrasena_hash)
        .execute(self.db.pool())
        .await?;

        self.db.notify(Table::Usuarios);
        Ok(result.last_insert_rowid())
    }

    async fn get_usuario(&self, id_usuario: i64) -> Result<Option<Usuario>> {
        let row = sqlx::query(
            r#"
            SELECT id_usuario, nombre, apellido, usuario_login, contrasena
            FROM usuarios
            WHERE id_usuario = ?
            "#,
        )
        .bind(id_usuario)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(row_to_usuario))
    }

    async fn get_usuario_by_login(&self, usuario_login: &str) -> Result<Option<Usuario>> {
        let row = sqlx::query(
            r#"
            SELECT id_usuario, nombre, apellido, usuario_login, contrasena
            FROM usuarios
            WHERE usuario_login = ?
            "#,
        )
        .bind(usuario_login)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(row_to_usuario))
    }

    async fn delete_usuario(&self, id_usuario: i64) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM usuarios WHERE id_usuario = ?
            "#,
        )
        .bind(id_usuario)
        .execute(self.db.pool())
        .await?;

        // SET NULL detaches the user's payments instead of deleting them
        self.db.notify(Table::Usuarios);
        self.db.notify(Table::Cobros);
        Ok(())
    }
}
