use crate::config::AppConfig;
use crate::entities::upload_records;
use crate::utils::retry::{BackoffStrategy, retry_with_backoff};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(3);

pub async fn setup_database(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", config.database_url);

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = retry_with_backoff(
        CONNECT_ATTEMPTS,
        BackoffStrategy::Fixed(CONNECT_RETRY_DELAY),
        |_| true,
        |attempt| {
            let opt = opt.clone();
            async move {
                if attempt > 1 {
                    tracing::warn!("Retrying database connection (attempt {})", attempt);
                }
                Database::connect(opt).await
            }
        },
    )
    .await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    let stmt = schema
        .create_table_from_entity(upload_records::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&stmt)).await?;

    // Secondary indexes; the unique index on cid comes from the entity itself
    let index_stmts = [
        "CREATE INDEX IF NOT EXISTS idx_upload_records_wallet_address ON upload_records(wallet_address)",
        "CREATE INDEX IF NOT EXISTS idx_upload_records_transaction_hash ON upload_records(transaction_hash)",
        "CREATE INDEX IF NOT EXISTS idx_upload_records_wallet_created ON upload_records(wallet_address, created_at)",
    ];

    for query in index_stmts {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_string()))
            .await
        {
            Ok(_) => info!("   - Executed: {}", query),
            Err(e) => tracing::warn!("   - Index statement failed: {} -> {}", query, e),
        }
    }

    Ok(())
}
