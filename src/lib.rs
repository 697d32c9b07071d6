//! Bookshelf: a REST CRUD service for a books catalogue.

pub mod modules;

use anyhow::Context;
use sqlx::SqlitePool;

use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Register every module, run their `init` hooks and migrations, then start them.
pub async fn bootstrap(settings: &Settings, pool: &SqlitePool) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool);

    let ctx = InitCtx { settings };

    registry
        .init_modules(&ctx)
        .await
        .context("module initialization failed")?;

    let applied = bookshelf_db::run_migrations(pool, &registry.collect_migrations())
        .await
        .context("database migrations failed")?;
    tracing::info!(applied, "migrations complete");

    registry
        .start_modules(&ctx)
        .await
        .context("module start failed")?;

    Ok(registry)
}
