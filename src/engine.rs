//! Database access.
//!
//! The run only needs three things from a server: the names of its tables,
//! the DDL of each table, and a way to execute a statement. [`Database`]
//! captures that; [`MySqlDatabase`] provides it over a sqlx pool.

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Executor, Row};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{DefError, DefResult};

/// Lists base tables only; views have no `CREATE TABLE` to compare.
const LIST_TABLES: &str = "SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'";

/// What the run needs from a live database.
#[allow(async_fn_in_trait)]
pub trait Database {
    /// Names of the existing base tables (not views), in the order the
    /// server lists them.
    async fn table_names(&self) -> DefResult<Vec<String>>;

    /// The server's `CREATE TABLE` text for `table`.
    async fn show_create_table(&self, table: &str) -> DefResult<String>;

    /// Run one statement.
    async fn execute(&mut self, sql: &str) -> DefResult<()>;
}

/// A MySQL server reached through sqlx.
#[derive(Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    /// Connect to `database` using `config`.
    pub async fn connect(config: &ConnectionConfig, database: &str) -> DefResult<Self> {
        let mut options = MySqlConnectOptions::new()
            .username(&config.user)
            .database(database);
        options = match &config.socket {
            Some(socket) => options.socket(socket),
            None => options.host(&config.host).port(config.port),
        };
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DefError::Connection(e.to_string()))?;

        info!(host = %config.host, port = config.port, database, "connected");
        Ok(Self { pool })
    }

    async fn query(&self, sql: &str) -> DefResult<Vec<MySqlRow>> {
        debug!(sql, "query");
        self.pool
            .fetch_all(sql)
            .await
            .map_err(|e| classify(sql, e))
    }
}

impl Database for MySqlDatabase {
    async fn table_names(&self) -> DefResult<Vec<String>> {
        self.query(LIST_TABLES)
            .await?
            .iter()
            .map(|row| text_column(row, 0, LIST_TABLES))
            .collect()
    }

    async fn show_create_table(&self, table: &str) -> DefResult<String> {
        let sql = format!("SHOW CREATE TABLE `{}`", table.replace('`', "``"));
        let rows = self.query(&sql).await?;
        match rows.first() {
            Some(row) => text_column(row, 1, &sql),
            None => Err(DefError::execution(sql, "no rows returned")),
        }
    }

    async fn execute(&mut self, sql: &str) -> DefResult<()> {
        debug!(sql, "execute");
        self.pool
            .execute(sql)
            .await
            .map(|_| ())
            .map_err(|e| classify(sql, e))
    }
}

/// Statements the server refuses are execution errors; anything else means
/// the connection is unusable.
fn classify(sql: &str, err: sqlx::Error) -> DefError {
    match err {
        sqlx::Error::Database(e) => DefError::execution(sql, e.message()),
        other => DefError::Connection(other.to_string()),
    }
}

/// Catalog columns come back as text on some servers and as binary on others.
fn text_column(row: &MySqlRow, index: usize, sql: &str) -> DefResult<String> {
    if let Ok(text) = row.try_get::<String, _>(index) {
        return Ok(text);
    }
    row.try_get::<Vec<u8>, _>(index)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| DefError::execution(sql, e.to_string()))
}
