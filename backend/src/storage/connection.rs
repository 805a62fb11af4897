use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::events::{ChangeNotifier, Table};

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:cobros.db";

// Process-wide handle; first caller initializes, everyone else reuses it
static SHARED: OnceCell<DbConnection> = OnceCell::const_new();

/// DbConnection manages the single SQLite database and fans out change
/// notifications to live queries after every write.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
    notifier: ChangeNotifier,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // The cascade and SET NULL rules only fire with foreign keys
        // enabled, which SQLite leaves off per connection by default
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
            notifier: ChangeNotifier::new(),
        })
    }

    /// The process-wide connection, created lazily on first access.
    /// Concurrent first callers race on a one-time init; the winner's
    /// connection is memoized and handed to everyone.
    pub async fn shared() -> Result<&'static DbConnection> {
        let db = SHARED.get_or_try_init(|| Self::new(DATABASE_URL)).await?;
        Ok(db)
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Unique shared-cache in-memory database per test
        let test_id = uuid::Uuid::new_v4().simple().to_string();
        let db_url = format!("sqlite:file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Publish a table change to every live query
    pub(crate) fn notify(&self, table: Table) {
        self.notifier.publish(table);
    }

    pub(crate) fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Table> {
        self.notifier.subscribe()
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usuarios (
                id_usuario INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre TEXT NOT NULL,
                apellido TEXT NOT NULL,
                usuario_login TEXT NOT NULL,
                contrasena TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comerciantes (
                id_comerciante INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre_comerciante TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS puestos (
                id_puesto INTEGER PRIMARY KEY AUTOINCREMENT,
                numero_puesto TEXT NOT NULL,
                id_comerciante INTEGER NOT NULL,
                FOREIGN KEY (id_comerciante) REFERENCES comerciantes (id_comerciante) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_puestos_numero
            ON puestos(numero_puesto);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cobros (
                id_cobro INTEGER PRIMARY KEY AUTOINCREMENT,
                id_puesto INTEGER NOT NULL,
                monto_cobrado REAL NOT NULL,
                dinero_recibido REAL NOT NULL,
                vuelto REAL NOT NULL,
                fecha_cobro TEXT NOT NULL,
                latitud REAL,
                longitud REAL,
                id_usuario INTEGER,
                FOREIGN KEY (id_puesto) REFERENCES puestos (id_puesto) ON DELETE CASCADE,
                FOREIGN KEY (id_usuario) REFERENCES usuarios (id_usuario) ON DELETE SET NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Payment lists and searches are always ordered by date descending
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_cobros_fecha
            ON cobros(fecha_cobro DESC);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
