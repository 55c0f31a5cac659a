// Property-based tests for the query engine and grid reconciler.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use datapacket_engine::*;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Arbitrary raw cell: mostly numeric, sometimes a date, text, or empty.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"-?[0-9]{1,6}(\.[0-9]{1,2})?",
        1 => r"20[0-9]{2}-0[1-9]-1[0-9]",
        1 => r"[a-zA-Z ]{0,12}",
        1 => Just("".to_string()),
    ]
}

fn arb_column_type() -> impl Strategy<Value = ColumnType> {
    prop_oneof![Just(ColumnType::Text), Just(ColumnType::Number), Just(ColumnType::Date)]
}

fn dataset_of(column_type: ColumnType, values: &[String]) -> Dataset {
    let columns = vec![ColumnDefinition::new("v", column_type)];
    let rows: Vec<RawRow> = values
        .iter()
        .map(|v| [("v".to_string(), RawValue::from(v.as_str()))].into_iter().collect())
        .collect();
    finalize(&columns, &rows).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn nulls_sort_last_in_both_directions(
        column_type in arb_column_type(),
        values in proptest::collection::vec(arb_value(), 1..40),
        descending in any::<bool>(),
    ) {
        let ds = dataset_of(column_type, &values);
        let rows: Vec<&Row> = ds.rows().iter().collect();
        let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
        let sorted = sort_rows(&rows, ds.schema(), "v", direction);

        prop_assert_eq!(sorted.len(), rows.len());
        let nulls: Vec<bool> = sorted.iter().map(|r| r.get("v").unwrap().is_null()).collect();
        if let Some(first_null) = nulls.iter().position(|n| *n) {
            prop_assert!(nulls[first_null..].iter().all(|n| *n), "non-null after null: {:?}", nulls);
        }
    }

    #[test]
    fn blank_filter_is_identity(
        column_type in arb_column_type(),
        values in proptest::collection::vec(arb_value(), 1..30),
        blank in r"[ \t]{0,3}",
    ) {
        let ds = dataset_of(column_type, &values);
        let rows: Vec<&Row> = ds.rows().iter().collect();
        for op in FilterOperator::applicable(column_type) {
            let out = filter_rows(&rows, ds.schema(), "v", *op, &blank);
            let ids: Vec<RowId> = out.iter().map(|r| r.id()).collect();
            let expected: Vec<RowId> = rows.iter().map(|r| r.id()).collect();
            prop_assert_eq!(ids, expected);
        }
    }

    #[test]
    fn numeric_aggregates_are_null_only_without_values(
        values in proptest::collection::vec(arb_value(), 1..30),
    ) {
        let ds = dataset_of(ColumnType::Number, &values);
        let rows: Vec<&Row> = ds.rows().iter().collect();
        let any_number = rows.iter().any(|r| !r.get("v").unwrap().is_null());
        for op in [AggregateOp::Sum, AggregateOp::Avg, AggregateOp::Min, AggregateOp::Max] {
            let result = aggregate_rows(&rows, ds.schema(), op, Some("v"));
            prop_assert_eq!(result.is_some(), any_number);
        }
        prop_assert_eq!(aggregate_rows(&rows, ds.schema(), AggregateOp::Count, None), Some(rows.len() as f64));
    }

    #[test]
    fn paste_grows_grid_to_fit_block(
        existing_rows in 1usize..6,
        existing_cols in 1usize..6,
        anchor_row in 0usize..8,
        anchor_col in 0usize..8,
        block in (1usize..5, 1usize..5).prop_flat_map(|(h, w)| {
            proptest::collection::vec(proptest::collection::vec(r"[a-z0-9]{1,4}", w), h)
        }),
    ) {
        let mut grid = Grid::new();
        grid.set_cell(existing_rows - 1, existing_cols - 1, "seed");

        // Anchor must be an existing cell
        let anchor = CellPos::new(anchor_row % existing_rows, anchor_col % existing_cols);
        let text = block.iter().map(|line| line.join("\t")).collect::<Vec<_>>().join("\n");
        let outcome = grid.paste(Some(anchor), &text).unwrap();

        let (h, w) = (block.len(), block[0].len());
        prop_assert_eq!((outcome.block_rows, outcome.block_cols), (h, w));
        prop_assert_eq!(grid.row_count(), existing_rows.max(anchor.row + h));
        prop_assert_eq!(grid.col_count(), existing_cols.max(anchor.col + w));
        for (i, line) in block.iter().enumerate() {
            for (j, value) in line.iter().enumerate() {
                prop_assert_eq!(grid.cell(anchor.row + i, anchor.col + j), value.as_str());
            }
        }
    }
}
