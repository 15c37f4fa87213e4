use std::{fs, path::Path, sync::Arc};

use sqlwizard::{
    AggregateFunction, AggregateTarget, CatalogTarget, DuckDbConnection, FilterOperator, JoinKind,
    Session, SortDirection, TableRef, WizardConfig,
};
use tracing_subscriber::EnvFilter;

const SEED: &str = "
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name VARCHAR,
        country VARCHAR
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER,
        amount DOUBLE,
        created_at TIMESTAMP
    );
    INSERT INTO customers VALUES
        (1, 'Alice', 'US'),
        (2, 'Bob', 'UK'),
        (3, 'Carla', 'US');
    INSERT INTO orders VALUES
        (1, 1, 100.0, '2023-01-01'),
        (2, 1, 50.0, '2023-01-02'),
        (3, 2, 25.0, '2023-01-03');
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlwizard=info")),
        )
        .init();

    let db_path = Path::new("demo.duckdb");
    if db_path.exists() {
        fs::remove_file(db_path)?;
    }
    let conn = DuckDbConnection::new(db_path);
    conn.execute_batch(SEED).await?;

    let mut config = WizardConfig::load_default();
    if config.targets.is_empty() {
        config.targets.push(CatalogTarget::new("demo", "main"));
    }
    let mut session = Session::with_backend(Arc::new(conn), config);

    for object in session.allowed_objects().await {
        println!("available: {object}");
    }

    let state = session.state_mut();
    state.set_base_table(TableRef::new("demo", "main", "orders"));
    let join = state.add_join_step();
    state.set_join_table(join, TableRef::new("demo", "main", "customers"))?;
    state.set_join_keys(join, vec!["customer_id".into()], vec!["id".into()])?;
    state.set_join_kind(join, JoinKind::Left)?;
    session.confirm_tables().await?;

    let state = session.state_mut();
    let filter = state.add_filter()?;
    state.update_filter(
        filter,
        Some("customers.country".into()),
        FilterOperator::Eq,
        "US",
    )?;
    state.select_column("customers.name")?;
    state.confirm_filters()?;
    let total = state.add_aggregation(AggregateFunction::Sum, "orders.amount".into())?;
    state.update_aggregation(
        total,
        AggregateFunction::Sum,
        "orders.amount".into(),
        "TOTAL_AMOUNT",
    )?;
    state.add_aggregation(AggregateFunction::Count, AggregateTarget::All)?;
    let order = state.add_order_by()?;
    state.update_order_by(order, "TOTAL_AMOUNT", SortDirection::Desc)?;

    let preview = session.generate().await?.clone();
    if let Some(sql) = session.pretty_sql() {
        println!("{sql}\n");
    }
    println!("rows: {}", preview.len());
    for row in preview.rows {
        println!("{row:?}");
    }
    Ok(())
}
