use crate::config::AppConfig;
use crate::entities;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;
use tracing::info;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };
    establish_connection_with_config(&config).await
}

/// Establishes a connection pool with custom pool settings
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    info!("Database connection established");
    Ok(pool)
}

/// Establishes a connection using the application configuration
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    establish_connection(&cfg.database_url).await
}

/// Creates any missing tables from the entity definitions
///
/// Runs on startup when `auto_migrate` is set, mirroring the behavior of
/// earlier deployments that created the schema on boot.
pub async fn create_tables(db: &DbPool) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::country::Entity),
        schema.create_table_from_entity(entities::employee::Entity),
        schema.create_table_from_entity(entities::role::Entity),
        schema.create_table_from_entity(entities::employee_role::Entity),
        schema.create_table_from_entity(entities::module::Entity),
        schema.create_table_from_entity(entities::module_permission::Entity),
        schema.create_table_from_entity(entities::license::Entity),
        schema.create_table_from_entity(entities::job::Entity),
        schema.create_table_from_entity(entities::curriculum::Entity),
        schema.create_table_from_entity(entities::hardware_item::Entity),
        schema.create_table_from_entity(entities::ticket::Entity),
        schema.create_table_from_entity(entities::ticket_message::Entity),
        schema.create_table_from_entity(entities::ticket_attachment::Entity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        db.execute(backend.build(statement)).await?;
    }

    info!("Database schema ensured");
    Ok(())
}
