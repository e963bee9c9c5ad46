use color_eyre::eyre::Result;
use dotenv::dotenv;
use fieldbook_api::config::ApiConfig;
use fieldbook_db::{create_pool, schema::initialize_database};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let config = ApiConfig::from_env()?;

    let db_pool = create_pool(&config.database_url).await?;

    // Tables must exist before the conflict index is hydrated
    initialize_database(&db_pool).await?;

    fieldbook_api::start_server(config, db_pool).await?;

    Ok(())
}
