use std::{fs, path::Path};

use anyhow::Result;
use sqlx::{Executor, PgPool};
use tracing::info;

pub async fn run_migrations(pool: &PgPool, migrations_dir: &Path) -> Result<()> {
    // Get all SQL files from the directory
    let mut entries = fs::read_dir(migrations_dir)?
        .filter_map(Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.extension().map(|ext| ext == "sql").unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect::<Vec<_>>();

    // Numbered files run in order; index creation always comes last
    entries.sort_by(|a, b| {
        let a_name = a.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let b_name = b.file_name().and_then(|n| n.to_str()).unwrap_or("");

        fn get_order_value(name: &str) -> usize {
            if name.starts_with("add_indexes") {
                return 1000;
            }
            name.split('_')
                .next()
                .and_then(|prefix| prefix.parse::<usize>().ok())
                .unwrap_or(usize::MAX)
        }

        get_order_value(a_name).cmp(&get_order_value(b_name))
    });

    // Execute each file in order
    for path in entries {
        execute_migration_file(pool, &path).await?;
        info!("Applied migration: {}", path.display());
    }

    Ok(())
}

async fn execute_migration_file(pool: &PgPool, path: &Path) -> Result<()> {
    let sql = fs::read_to_string(path)?;

    pool.execute(&*sql).await?;

    Ok(())
}
