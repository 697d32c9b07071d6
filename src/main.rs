use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database_url(),
        "bookshelf bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings).await?;
    let registry = bookshelf::bootstrap(&settings, &pool).await?;

    tracing::info!("bookshelf bootstrap complete");

    let served =
        bookshelf_http::start_server(&registry, &settings, bookshelf_http::shutdown_signal()).await;

    registry.stop_modules().await?;
    bookshelf_db::close(pool).await;

    served
}
