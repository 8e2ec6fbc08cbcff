//! Database connection pool and embedded schema

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("migrations/001_initial.sql"),
)];

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
}

/// Split SQL into statements, keeping `$$`-quoted bodies (DO blocks, functions) intact
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_block = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' && chars.peek() == Some(&'$') {
            current.push('$');
            chars.next();
            in_dollar_block = !in_dollar_block;
        } else if c == ';' && !in_dollar_block {
            if has_sql_content(&current) {
                statements.push(current.trim().to_string());
            }
            current.clear();
        }
    }

    if has_sql_content(&current) {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Check if a string has actual SQL content (not just comments)
fn has_sql_content(s: &str) -> bool {
    s.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with("--")
    })
}

/// Apply the embedded schema. Every statement is idempotent, so this runs on
/// each startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for (name, sql) in MIGRATIONS {
        let statements = split_sql_statements(sql);
        tracing::debug!("Applying migration {} ({} statements)", name, statements.len());

        for statement in statements {
            sqlx::query(&statement).execute(pool).await.map_err(|e| {
                tracing::error!("Migration {} failed: {}", name, e);
                e
            })?;
        }
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let sql = "CREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);\n";
        assert_eq!(
            split_sql_statements(sql),
            vec!["CREATE TABLE a (id INT);", "CREATE TABLE b (id INT);"]
        );
    }

    #[test]
    fn test_split_keeps_dollar_blocks_together() {
        let sql = r#"
DO $$ BEGIN
    CREATE TYPE t AS ENUM ('a');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;
SELECT 1;
"#;
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("DO $$"));
        assert!(statements[0].ends_with("END $$;"));
        assert_eq!(statements[1], "SELECT 1;");
    }

    #[test]
    fn test_split_skips_comment_only_chunks() {
        let sql = "-- header\nSELECT 1;\n-- trailing comment\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].ends_with("SELECT 1;"));
    }

    #[test]
    fn test_embedded_schema_splits() {
        let statements = split_sql_statements(MIGRATIONS[0].1);
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE TABLE IF NOT EXISTS complaints ")));
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE TABLE IF NOT EXISTS complaint_updates")));
        assert!(statements.iter().all(|s| s.ends_with(';')));
    }
}
