use sqlx::PgPool;

/// All `id` columns must be bigint.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_pks_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert_eq!(data_type, "bigint", "Table {table}.id should be bigint");
    }
}

/// Every table (except _sqlx_migrations) must have created_at and updated_at as timestamptz.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let result: Option<(String,)> = sqlx::query_as(
                "SELECT data_type
                 FROM information_schema.columns
                 WHERE table_schema = 'public'
                   AND table_name = $1
                   AND column_name = $2",
            )
            .bind(table)
            .bind(col)
            .fetch_optional(&pool)
            .await
            .unwrap();

            let (data_type,) =
                result.unwrap_or_else(|| panic!("Table {table} is missing column {col}"));
            assert_eq!(
                data_type, "timestamp with time zone",
                "Table {table}.{col} should be timestamptz, got {data_type}"
            );
        }
    }
}

/// Money columns are integer minor units, never floating point or numeric.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_money_columns_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT table_name, column_name, data_type
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND column_name IN ('amount', 'price', 'hourly_price', 'total_price', 'refunded_amount')
         ORDER BY table_name, column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, column, data_type) in &rows {
        assert_eq!(data_type, "bigint", "{table}.{column} should be bigint");
    }
}

/// No character varying columns should exist; TEXT is preferred.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_no_varchar_columns(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, column_name
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND data_type = 'character varying'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name, column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(
        rows.is_empty(),
        "Found VARCHAR columns (should use TEXT): {:?}",
        rows
    );
}

/// Every foreign key column must lead at least one index.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_fks_have_indexes(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT
             tc.table_name,
             kcu.column_name
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
         WHERE tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = 'public'
         ORDER BY tc.table_name, kcu.column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!fk_columns.is_empty());
    for (table, column) in &fk_columns {
        let has_index: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1
                FROM pg_index i
                JOIN pg_class t ON t.oid = i.indrelid
                JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = i.indkey[0]
                WHERE t.relname = $1
                  AND a.attname = $2
                  AND i.indpred IS NULL
            )",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(has_index, "FK column {table}.{column} has no index");
    }
}

/// `updated_at` must be maintained by the shared trigger on every table
/// that has one.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_updated_at_triggers_exist(pool: PgPool) {
    let missing: Vec<(String,)> = sqlx::query_as(
        "SELECT c.table_name
         FROM information_schema.columns c
         WHERE c.table_schema = 'public'
           AND c.column_name = 'updated_at'
           AND NOT EXISTS (
               SELECT 1 FROM information_schema.triggers tr
               WHERE tr.event_object_table = c.table_name
                 AND tr.trigger_name = 'set_updated_at'
           )
         ORDER BY c.table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(
        missing.is_empty(),
        "Tables without set_updated_at trigger: {:?}",
        missing
    );
}
