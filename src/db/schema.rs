use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, Executor, MySqlConnection};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::db::DbError;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS weather (
    id INT AUTO_INCREMENT PRIMARY KEY,
    city VARCHAR(100) NOT NULL,
    temperature DOUBLE,
    humidity INT,
    wind_speed DOUBLE,
    pressure INT,
    weather_condition VARCHAR(100),
    description VARCHAR(255),
    icon VARCHAR(10),
    date_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    INDEX idx_city_datetime (city, date_time DESC)
)
"#;

/// Connect options for the configured credentials with no database selected,
/// so the database itself can be created on first boot.
pub fn admin_options(config: &Config) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .password(&config.db_password)
}

/// Connect options scoped to the configured database.
pub fn database_options(config: &Config) -> MySqlConnectOptions {
    admin_options(config).database(&config.db_name)
}

/// Create the database and the `weather` table if they do not exist yet.
/// Idempotent; callers decide whether a failure is fatal.
#[instrument(skip(config), fields(db_name = %config.db_name))]
pub async fn ensure_schema(config: &Config) -> Result<(), DbError> {
    debug!("Connecting without a database selected");
    let mut conn = MySqlConnection::connect_with(&admin_options(config)).await?;
    let create_db = format!("CREATE DATABASE IF NOT EXISTS `{}`", config.db_name);
    conn.execute(create_db.as_str()).await?;
    conn.close().await?;

    debug!("Ensuring weather table exists");
    let mut conn = MySqlConnection::connect_with(&database_options(config)).await?;
    conn.execute(CREATE_TABLE).await?;
    conn.close().await?;

    info!("Database schema ensured for {}", config.db_name);
    Ok(())
}
