//! Live round-trip tests, one per engine.
//!
//! Each test is skipped unless its environment variable holds a connection
//! string to a disposable database:
//! DB_BRIDGE_TEST_POSTGRES, DB_BRIDGE_TEST_MYSQL, DB_BRIDGE_TEST_SQLSERVER,
//! DB_BRIDGE_TEST_MONGODB.
//!
//! Rows are seeded through each engine's own driver, since the bridge has no
//! insert operation.

use db_bridge::Bridge;
use db_bridge::db::sqlserver::SqlServerTarget;
use db_bridge::models::{AlterOperation, ColumnDescriptor, ConnectOptions, EngineTag};
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use sqlx::Connection as _;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use std::time::Duration;
use tiberius::SqlBrowser;
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

const SEEDED_ROWS: u64 = 3;
const PAGE_LIMIT: u64 = 2;

fn connection_from_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(url) if !url.trim().is_empty() => Some(url),
        _ => {
            eprintln!("Skipping test: {} not set", var);
            None
        }
    }
}

fn bridge() -> Bridge {
    Bridge::new(ConnectOptions::default().with_connect_timeout(Duration::from_secs(10)))
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

fn unique_table() -> String {
    unique_name("bridge_test")
}

/// Key under which fetch_schema reports `table`.
fn schema_key(engine: EngineTag, table: &str) -> String {
    match engine {
        EngineTag::RelationalA => format!("public.{}", table),
        EngineTag::RelationalC => format!("dbo.{}", table),
        _ => table.to_string(),
    }
}

/// Run one SQL batch through the engine's own driver.
async fn execute_native(engine: EngineTag, cs: &str, sql: &str) {
    match engine {
        EngineTag::RelationalA => {
            let mut conn = PgConnection::connect(cs).await.unwrap();
            sqlx::raw_sql(sql).execute(&mut conn).await.unwrap();
            conn.close().await.unwrap();
        }
        EngineTag::RelationalB => {
            let mut conn = MySqlConnection::connect(cs).await.unwrap();
            sqlx::raw_sql(sql).execute(&mut conn).await.unwrap();
            conn.close().await.unwrap();
        }
        EngineTag::RelationalC => {
            let config = SqlServerTarget::parse(cs).unwrap().config();
            let tcp = TcpStream::connect_named(&config).await.unwrap();
            tcp.set_nodelay(true).unwrap();
            let mut client = tiberius::Client::connect(config, tcp.compat_write())
                .await
                .unwrap();
            client
                .simple_query(sql)
                .await
                .unwrap()
                .into_results()
                .await
                .unwrap();
            client.close().await.unwrap();
        }
        other => panic!("no SQL driver for {}", other),
    }
}

/// Same connection string, pointed at another database.
fn with_database(engine: EngineTag, cs: &str, database: &str) -> String {
    if !cs.contains("://") {
        let mut parts: Vec<&str> = cs
            .split(';')
            .filter(|part| {
                let key = part.split('=').next().unwrap_or("").trim();
                !part.trim().is_empty()
                    && !key.eq_ignore_ascii_case("database")
                    && !key.eq_ignore_ascii_case("initial catalog")
            })
            .collect();
        let pair = format!("Database={}", database);
        parts.push(&pair);
        return parts.join(";");
    }

    let mut url = url::Url::parse(cs).unwrap();
    // MongoDB authenticates against the path database unless told otherwise
    if engine == EngineTag::Document
        && !url.username().is_empty()
        && !url.query_pairs().any(|(k, _)| k.eq_ignore_ascii_case("authSource"))
    {
        let original = url.path().trim_start_matches('/').to_string();
        url.query_pairs_mut().append_pair("authSource", &original);
    }
    url.set_path(&format!("/{}", database));
    url.to_string()
}

/// Page through `key` with a fixed limit at offsets 0, N-1, N and past N.
/// Each page holds `min(limit, max(0, N - offset))` rows and reports more
/// rows exactly when `offset + limit < N`.
async fn assert_pagination(bridge: &Bridge, cs: &str, key: &str, total: u64) {
    for offset in [0, total - 1, total, total + 5] {
        let page = bridge
            .table_data(cs, key, Some(PAGE_LIMIT), Some(offset))
            .await
            .unwrap();
        let expected = PAGE_LIMIT.min(total.saturating_sub(offset));
        assert_eq!(page.rows.len() as u64, expected, "rows at offset {}", offset);
        assert_eq!(page.total, total, "total at offset {}", offset);
        assert_eq!(page.limit, PAGE_LIMIT);
        assert_eq!(page.offset, offset);
        assert_eq!(
            page.has_more,
            offset + PAGE_LIMIT < total,
            "has_more at offset {}",
            offset
        );
    }
}

/// A freshly created database reports no tables at all.
async fn assert_new_database_is_empty(cs: &str) {
    let bridge = bridge();
    let engine = bridge.test_connection(cs).await.unwrap();
    let database = unique_name("bridge_db");
    bridge.create_database(cs, &database).await.unwrap();

    let fresh = with_database(engine, cs, &database);
    let schema = bridge.fetch_schema(&fresh).await.unwrap();
    assert!(schema.is_empty(), "unexpected tables: {:?}", schema.keys());

    // MongoDB drops its marker collection, so nothing is left behind there
    if engine != EngineTag::Document {
        execute_native(engine, cs, &format!("DROP DATABASE {}", database)).await;
    }
}

/// Create, seed, alter, page, then drop a table on a relational engine.
async fn relational_roundtrip(cs: &str, id_type: &str, text_type: &str) {
    let bridge = bridge();
    let engine = bridge.test_connection(cs).await.unwrap();
    let table = unique_table();
    let key = schema_key(engine, &table);

    let columns = vec![
        ColumnDescriptor::new("id", id_type).primary_key().auto_increment(),
        ColumnDescriptor::new("name", text_type).not_null(),
        ColumnDescriptor::new("legacy", text_type),
    ];
    bridge.create_table(cs, &table, &columns).await.unwrap();

    let schema = bridge.fetch_schema(cs).await.unwrap();
    let created = schema.get(&key).expect("created table missing from schema");
    assert_eq!(created.columns, vec!["id", "name", "legacy"]);
    assert_eq!(created.primary_keys, vec!["id"]);
    assert_eq!(created.nullable["name"], false);
    assert_eq!(created.nullable["legacy"], true);
    assert_eq!(created.row_count, 0);

    let page = bridge.table_data(cs, &key, Some(10), None).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.rows.is_empty());
    assert!(!page.has_more);

    execute_native(
        engine,
        cs,
        &format!(
            "INSERT INTO {} (name, legacy) VALUES ('row 1', 'old'), ('row 2', 'old'), ('row 3', 'old')",
            key
        ),
    )
    .await;

    let schema = bridge.fetch_schema(cs).await.unwrap();
    assert_eq!(schema[&key].row_count, SEEDED_ROWS as i64);
    assert_pagination(&bridge, cs, &key, SEEDED_ROWS).await;

    let ops = vec![
        AlterOperation::Add(ColumnDescriptor::new("age", "INT")),
        AlterOperation::Drop("legacy".into()),
    ];
    bridge.alter_table(cs, &key, &ops).await.unwrap();

    let schema = bridge.fetch_schema(cs).await.unwrap();
    let altered = &schema[&key];
    assert_eq!(altered.columns, vec!["id", "name", "age"]);
    assert_eq!(altered.row_count, SEEDED_ROWS as i64);

    let page = bridge.table_data(cs, &key, None, None).await.unwrap();
    assert_eq!(page.total, SEEDED_ROWS);
    assert_eq!(page.rows.len() as u64, SEEDED_ROWS);
    assert!(!page.has_more);
    let names: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "age"]);
    for row in &page.rows {
        assert!(row["age"].is_null());
        assert!(!row.contains_key("legacy"));
        assert!(row["name"].as_str().unwrap().starts_with("row "));
    }

    // A failing operation surfaces as a DDL error naming its position
    let bad = vec![
        AlterOperation::Add(ColumnDescriptor::new("extra", "INT")),
        AlterOperation::Drop("no_such_column".into()),
    ];
    let err = bridge.alter_table(cs, &key, &bad).await.unwrap_err();
    assert_eq!(err.kind(), "ddl_error");
    assert!(err.to_string().contains("operation 2 (drop)"));

    bridge.drop_table(cs, &key).await.unwrap();
    bridge.drop_table(cs, &key).await.unwrap();

    let err = bridge.table_data(cs, &key, None, None).await.unwrap_err();
    assert_eq!(err.kind(), "query_error");
}

#[tokio::test]
async fn test_postgres_roundtrip() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_POSTGRES") else {
        return;
    };
    relational_roundtrip(&cs, "INTEGER", "TEXT").await;
}

#[tokio::test]
async fn test_mysql_roundtrip() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_MYSQL") else {
        return;
    };
    relational_roundtrip(&cs, "INT", "VARCHAR(255)").await;
}

#[tokio::test]
async fn test_sqlserver_roundtrip() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_SQLSERVER") else {
        return;
    };
    relational_roundtrip(&cs, "INT", "NVARCHAR(255)").await;
}

#[tokio::test]
async fn test_postgres_new_database_is_empty() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_POSTGRES") else {
        return;
    };
    assert_new_database_is_empty(&cs).await;
}

#[tokio::test]
async fn test_mysql_new_database_is_empty() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_MYSQL") else {
        return;
    };
    assert_new_database_is_empty(&cs).await;
}

#[tokio::test]
async fn test_sqlserver_new_database_is_empty() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_SQLSERVER") else {
        return;
    };
    assert_new_database_is_empty(&cs).await;
}

#[tokio::test]
async fn test_mongodb_new_database_is_empty() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_MONGODB") else {
        return;
    };
    assert_new_database_is_empty(&cs).await;
}

#[tokio::test]
async fn test_postgres_alter_rolls_back_on_failure() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_POSTGRES") else {
        return;
    };
    let bridge = bridge();
    let table = unique_table();
    let key = schema_key(EngineTag::RelationalA, &table);
    bridge
        .create_table(&cs, &table, &[ColumnDescriptor::new("id", "INTEGER").primary_key()])
        .await
        .unwrap();

    let ops = vec![
        AlterOperation::Add(ColumnDescriptor::new("kept", "TEXT")),
        AlterOperation::Drop("missing".into()),
    ];
    assert!(bridge.alter_table(&cs, &key, &ops).await.is_err());

    let schema = bridge.fetch_schema(&cs).await.unwrap();
    assert_eq!(schema[&key].columns, vec!["id"]);

    bridge.drop_table(&cs, &key).await.unwrap();
}

#[tokio::test]
async fn test_postgres_modify_keeps_serial_default() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_POSTGRES") else {
        return;
    };
    let bridge = bridge();
    let table = unique_table();
    let key = schema_key(EngineTag::RelationalA, &table);
    let columns = vec![
        ColumnDescriptor::new("id", "INTEGER").primary_key().auto_increment(),
        ColumnDescriptor::new("name", "TEXT"),
    ];
    bridge.create_table(&cs, &table, &columns).await.unwrap();

    let ops = vec![AlterOperation::Modify(
        ColumnDescriptor::new("id", "BIGINT").auto_increment(),
    )];
    bridge.alter_table(&cs, &key, &ops).await.unwrap();

    // Rows inserted without an id still get one from the sequence
    execute_native(
        EngineTag::RelationalA,
        &cs,
        &format!("INSERT INTO {} (name) VALUES ('a'), ('b')", key),
    )
    .await;
    let page = bridge.table_data(&cs, &key, None, None).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.rows.iter().all(|row| !row["id"].is_null()));

    bridge.drop_table(&cs, &key).await.unwrap();
}

/// Connect with the MongoDB driver directly and return the handle to
/// `collection` in the connection string's database.
async fn native_collection(cs: &str, collection: &str) -> mongodb::Collection<Document> {
    let options = ClientOptions::parse(cs).await.unwrap();
    let database = options.default_database.clone().unwrap();
    let client = mongodb::Client::with_options(options).unwrap();
    client.database(&database).collection(collection)
}

#[tokio::test]
async fn test_mongodb_create_table_does_not_report_requested_columns() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_MONGODB") else {
        return;
    };
    let bridge = bridge();
    let collection = unique_table();
    let columns = vec![
        ColumnDescriptor::new("name", "string"),
        ColumnDescriptor::new("age", "int").with_default("18"),
    ];
    bridge.create_table(&cs, &collection, &columns).await.unwrap();

    // The seed document is deleted before create_table returns, so nothing
    // is left to sample the requested names from
    let schema = bridge.fetch_schema(&cs).await.unwrap();
    let created = schema.get(&collection).expect("collection missing from schema");
    assert!(created.columns.is_empty());
    assert_eq!(created.primary_keys, vec!["_id"]);
    assert_eq!(created.row_count, 0);

    bridge.drop_table(&cs, &collection).await.unwrap();
}

#[tokio::test]
async fn test_mongodb_roundtrip() {
    let Some(cs) = connection_from_env("DB_BRIDGE_TEST_MONGODB") else {
        return;
    };
    let bridge = bridge();
    assert_eq!(bridge.test_connection(&cs).await.unwrap(), EngineTag::Document);

    let collection = unique_table();
    let columns = vec![
        ColumnDescriptor::new("name", "string"),
        ColumnDescriptor::new("legacy", "string"),
    ];
    bridge.create_table(&cs, &collection, &columns).await.unwrap();

    native_collection(&cs, &collection)
        .await
        .insert_many(vec![
            doc! { "name": "row 1", "legacy": "old" },
            doc! { "name": "row 2", "legacy": "old" },
            doc! { "name": "row 3", "legacy": "old" },
        ])
        .await
        .unwrap();

    let schema = bridge.fetch_schema(&cs).await.unwrap();
    let seeded = &schema[&collection];
    assert_eq!(seeded.columns, vec!["_id", "name", "legacy"]);
    assert_eq!(seeded.column_types["name"], "string");
    assert_eq!(seeded.row_count, SEEDED_ROWS as i64);
    assert_pagination(&bridge, &cs, &collection, SEEDED_ROWS).await;

    let ops = vec![
        AlterOperation::Add(ColumnDescriptor::new("score", "double")),
        AlterOperation::Drop("legacy".into()),
    ];
    bridge.alter_table(&cs, &collection, &ops).await.unwrap();

    let schema = bridge.fetch_schema(&cs).await.unwrap();
    let altered = &schema[&collection];
    assert_eq!(altered.columns, vec!["_id", "name", "score"]);
    assert_eq!(altered.row_count, SEEDED_ROWS as i64);

    let page = bridge.table_data(&cs, &collection, None, None).await.unwrap();
    assert_eq!(page.total, SEEDED_ROWS);
    assert!(!page.has_more);
    for row in &page.rows {
        assert!(row.contains_key("score"));
        assert!(!row.contains_key("legacy"));
    }

    bridge.drop_table(&cs, &collection).await.unwrap();
    bridge.drop_table(&cs, &collection).await.unwrap();

    let err = bridge.table_data(&cs, &collection, None, None).await.unwrap_err();
    assert_eq!(err.kind(), "query_error");

    let err = bridge.alter_table(&cs, &collection, &ops).await.unwrap_err();
    assert_eq!(err.kind(), "query_error");
    assert!(err.to_string().contains("not found"));
}
