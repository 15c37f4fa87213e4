//! Integration tests for statement compilation through the public API.

use sqlwizard::dialect::AnsiDialect;
use sqlwizard::{
    AggregateFunction, AggregateTarget, BuilderState, ColumnInfo, ColumnRef, CompileWarning,
    CompiledStatement, FilterOperator, JoinKind, SqlBuilder, TableRef, WizardError,
};

// ============================================================================
// Fixtures
// ============================================================================

fn col(alias: &str, table: &str, name: &str, data_type: &str) -> ColumnRef {
    ColumnRef::from_catalog(
        alias,
        table,
        &ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            comment: None,
        },
    )
}

fn compile(state: &BuilderState) -> Result<CompiledStatement, WizardError> {
    SqlBuilder::default().compile(state, &AnsiDialect)
}

/// ORDERS LEFT JOIN CUSTOMERS on CUSTOMER_ID = ID, columns confirmed.
fn orders_customers() -> BuilderState {
    let mut state = BuilderState::new();
    state.set_base_table(TableRef::new("DB", "SCHEMA", "ORDERS"));
    let join = state.add_join_step();
    state
        .set_join_table(join, TableRef::new("DB", "SCHEMA", "CUSTOMERS"))
        .unwrap();
    state
        .set_join_keys(join, vec!["CUSTOMER_ID".into()], vec!["ID".into()])
        .unwrap();
    state.set_join_kind(join, JoinKind::Left).unwrap();
    state
        .confirm_tables(vec![
            col("ORDERS", "ORDERS", "ID", "NUMBER(38,0)"),
            col("ORDERS", "ORDERS", "CUSTOMER_ID", "NUMBER(38,0)"),
            col("ORDERS", "ORDERS", "AMOUNT", "FLOAT"),
            col("CUSTOMERS", "CUSTOMERS", "ID", "NUMBER(38,0)"),
            col("CUSTOMERS", "CUSTOMERS", "NAME", "VARCHAR(16777216)"),
            col("CUSTOMERS", "CUSTOMERS", "COUNTRY", "VARCHAR(2)"),
        ])
        .unwrap();
    state
}

// ============================================================================
// Statement shape
// ============================================================================

#[test]
fn orders_customers_scenario() {
    let mut state = orders_customers();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(
            filter,
            Some("CUSTOMERS.COUNTRY".into()),
            FilterOperator::Like,
            "JP",
        )
        .unwrap();
    state.select_column("ORDERS.ID").unwrap();
    state.select_column("CUSTOMERS.NAME").unwrap();
    state.confirm_filters().unwrap();

    let compiled = compile(&state).unwrap();
    assert_eq!(
        compiled.sql,
        r#"SELECT "ORDERS"."ID" AS "ORDERS.ID", "CUSTOMERS"."NAME" AS "CUSTOMERS.NAME" FROM "DB"."SCHEMA"."ORDERS" AS "ORDERS" LEFT JOIN "DB"."SCHEMA"."CUSTOMERS" AS "CUSTOMERS" ON "ORDERS"."CUSTOMER_ID" = "CUSTOMERS"."ID" WHERE "CUSTOMERS"."COUNTRY" LIKE '%JP%' ESCAPE '\'"#
    );
    assert!(!compiled.aggregated);
    assert!(compiled.warnings.is_empty());
}

#[test]
fn pretty_layout_keeps_executable_text_compact() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    state.confirm_filters().unwrap();
    let compiled = compile(&state).unwrap();

    let pretty = compiled.pretty(&AnsiDialect);
    assert_eq!(
        pretty.lines().collect::<Vec<_>>(),
        vec![
            r#"SELECT "ORDERS"."ID" AS "ORDERS.ID""#,
            r#"FROM "DB"."SCHEMA"."ORDERS" AS "ORDERS""#,
            r#"LEFT JOIN "DB"."SCHEMA"."CUSTOMERS" AS "CUSTOMERS""#,
            r#"  ON "ORDERS"."CUSTOMER_ID" = "CUSTOMERS"."ID""#,
        ]
    );
    assert!(!compiled.sql.contains('\n'));
}

#[test]
fn multi_key_join_conjoins_on_clause() {
    let mut state = BuilderState::new();
    state.set_base_table(TableRef::new("DB", "S", "LINES"));
    let join = state.add_join_step();
    state
        .set_join_table(join, TableRef::new("DB", "S", "PRICES"))
        .unwrap();
    state
        .set_join_keys(
            join,
            vec!["SKU".into(), "REGION".into()],
            vec!["SKU".into(), "REGION".into()],
        )
        .unwrap();
    state
        .confirm_tables(vec![col("LINES", "LINES", "SKU", "VARCHAR")])
        .unwrap();
    state.select_column("LINES.SKU").unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.contains(
        r#"INNER JOIN "DB"."S"."PRICES" AS "PRICES" ON "LINES"."SKU" = "PRICES"."SKU" AND "LINES"."REGION" = "PRICES"."REGION""#
    ));
}

#[test]
fn join_chain_uses_previous_step_as_left_side() {
    let mut state = BuilderState::new();
    state.set_base_table(TableRef::new("DB", "S", "A"));
    let first = state.add_join_step();
    state.set_join_table(first, TableRef::new("DB", "S", "B")).unwrap();
    state
        .set_join_keys(first, vec!["B_ID".into()], vec!["ID".into()])
        .unwrap();
    let second = state.add_join_step();
    state.set_join_table(second, TableRef::new("DB", "S", "A")).unwrap();
    state
        .set_join_keys(second, vec!["A_ID".into()], vec!["ID".into()])
        .unwrap();
    state.set_join_kind(second, JoinKind::Full).unwrap();
    state.confirm_tables(vec![col("A", "A", "ID", "INT")]).unwrap();
    state.select_column("A.ID").unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.contains(r#"INNER JOIN "DB"."S"."B" AS "B" ON "A"."B_ID" = "B"."ID""#));
    assert!(sql.contains(r#"FULL JOIN "DB"."S"."A" AS "A_2" ON "B"."A_ID" = "A_2"."ID""#));
}

// ============================================================================
// Aliases and idempotence
// ============================================================================

#[test]
fn same_table_twice_gets_t_and_t_2() {
    let mut state = BuilderState::new();
    state.set_base_table(TableRef::new("DB", "S", "T"));
    let join = state.add_join_step();
    state.set_join_table(join, TableRef::new("DB", "S", "T")).unwrap();
    state
        .set_join_keys(join, vec!["PARENT_ID".into()], vec!["ID".into()])
        .unwrap();
    state.confirm_tables(vec![col("T", "T", "ID", "INT")]).unwrap();
    state.select_column("T.ID").unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.contains(r#"FROM "DB"."S"."T" AS "T" "#));
    assert!(sql.contains(r#"JOIN "DB"."S"."T" AS "T_2" ON "T"."PARENT_ID" = "T_2"."ID""#));
}

#[test]
fn recompiling_unchanged_state_is_byte_identical() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(filter, Some("ORDERS.AMOUNT".into()), FilterOperator::Gte, "10.5")
        .unwrap();
    state.confirm_filters().unwrap();

    let first = compile(&state).unwrap();
    let second = compile(&state).unwrap();
    assert_eq!(first.sql, second.sql);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn is_null_never_embeds_a_value() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(
            filter,
            Some("CUSTOMERS.NAME".into()),
            FilterOperator::IsNull,
            "'; DROP TABLE x; --",
        )
        .unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.ends_with(r#"WHERE "CUSTOMERS"."NAME" IS NULL"#));
    assert!(!sql.contains("DROP"));
}

#[test]
fn empty_value_is_omitted() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(filter, Some("CUSTOMERS.NAME".into()), FilterOperator::Eq, "")
        .unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(!sql.contains("WHERE"));
}

#[test]
fn non_numeric_value_on_numeric_column_is_dropped_with_warning() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let bad = state.add_filter().unwrap();
    state
        .update_filter(bad, Some("ORDERS.ID".into()), FilterOperator::Eq, "abc")
        .unwrap();
    let good = state.add_filter().unwrap();
    state
        .update_filter(good, Some("CUSTOMERS.COUNTRY".into()), FilterOperator::Eq, "JP")
        .unwrap();

    let compiled = compile(&state).unwrap();
    assert!(compiled.sql.ends_with(r#"WHERE "CUSTOMERS"."COUNTRY" = 'JP'"#));
    assert_eq!(
        compiled.warnings,
        vec![CompileWarning::DroppedNonNumericValue {
            column: "ORDERS.ID".into(),
            value: "abc".into(),
        }]
    );
}

#[test]
fn like_percent_is_matched_literally() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(filter, Some("CUSTOMERS.NAME".into()), FilterOperator::Like, "50%")
        .unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.ends_with(r#"LIKE '%50\%%' ESCAPE '\'"#));
}

#[test]
fn like_quote_and_underscore_are_escaped() {
    let mut state = orders_customers();
    state.select_column("ORDERS.ID").unwrap();
    let filter = state.add_filter().unwrap();
    state
        .update_filter(filter, Some("CUSTOMERS.NAME".into()), FilterOperator::Like, "O'_")
        .unwrap();

    let sql = compile(&state).unwrap().sql;
    assert!(sql.ends_with(r#"LIKE '%O''\_%' ESCAPE '\'"#));
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn aggregation_mode_groups_by_selected_columns() {
    let mut state = BuilderState::new();
    state.set_base_table(TableRef::new("DB", "S", "T"));
    state
        .confirm_tables(vec![col("T", "T", "A", "VARCHAR"), col("T", "T", "B", "VARCHAR")])
        .unwrap();
    state.select_column("T.A").unwrap();
    state.select_column("T.B").unwrap();
    state.confirm_filters().unwrap();
    let agg = state
        .add_aggregation(AggregateFunction::Count, AggregateTarget::All)
        .unwrap();
    state
        .update_aggregation(agg, AggregateFunction::Count, AggregateTarget::All, "CNT")
        .unwrap();

    let compiled = compile(&state).unwrap();
    assert!(compiled.aggregated);
    assert_eq!(
        compiled.sql,
        r#"SELECT "T"."A" AS "T.A", "T"."B" AS "T.B", COUNT(*) AS "CNT" FROM "DB"."S"."T" AS "T" GROUP BY "T"."A", "T"."B""#
    );
}

#[test]
fn repeated_default_alias_is_rejected() {
    let mut state = orders_customers();
    state.confirm_filters().unwrap();
    state
        .add_aggregation(AggregateFunction::Count, AggregateTarget::All)
        .unwrap();
    state
        .add_aggregation(AggregateFunction::Count, AggregateTarget::All)
        .unwrap();
    match compile(&state) {
        Err(WizardError::Validation(message)) => assert!(message.contains("COUNT_ALL")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn aliases_equal_after_sanitizing_are_rejected() {
    let mut state = orders_customers();
    state.confirm_filters().unwrap();
    let first = state
        .add_aggregation(AggregateFunction::Sum, "ORDERS.AMOUNT".into())
        .unwrap();
    state
        .update_aggregation(first, AggregateFunction::Sum, "ORDERS.AMOUNT".into(), "TOTAL")
        .unwrap();
    let second = state
        .add_aggregation(AggregateFunction::Max, "ORDERS.AMOUNT".into())
        .unwrap();
    state
        .update_aggregation(second, AggregateFunction::Max, "ORDERS.AMOUNT".into(), "TO-TAL")
        .unwrap();
    assert!(compile(&state).unwrap_err().is_validation());

    state
        .update_aggregation(second, AggregateFunction::Max, "ORDERS.AMOUNT".into(), "TOP")
        .unwrap();
    assert!(compile(&state).is_ok());
}

#[test]
fn wildcard_with_non_count_is_rejected() {
    let mut state = orders_customers();
    state.confirm_filters().unwrap();
    state
        .add_aggregation(AggregateFunction::Avg, AggregateTarget::All)
        .unwrap();
    let err = compile(&state).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn zero_select_targets_is_rejected() {
    let state = orders_customers();
    assert!(matches!(compile(&state), Err(WizardError::Validation(_))));
}
