use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Applied in order inside one transaction; the `user_version` pragma
/// records how many have run. Entry N takes the schema to version N+1.
const MIGRATIONS: [&str; 3] = [
    include_str!("schemas/schema_v1.sql"),
    include_str!("schemas/schema_v2.sql"),
    include_str!("schemas/schema_v3.sql"),
];

const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("could not read schema version")?;

    if applied > SCHEMA_VERSION {
        bail!("store schema is version {applied}, this build understands up to {SCHEMA_VERSION}");
    }
    if applied == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("could not begin migration transaction")?;

    for (step, sql) in MIGRATIONS.iter().enumerate().skip(applied as usize) {
        tx.execute_batch(sql)
            .with_context(|| format!("schema migration to version {} failed", step + 1))?;
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .context("could not record new schema version")?;
    tx.commit().context("could not commit schema migrations")?;

    Ok(())
}
