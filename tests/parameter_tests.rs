use memgrid::{DbError, Grid, Value};

async fn setup_grid() -> Grid {
    let grid = Grid::new();
    grid.execute(
        "CREATE MAPPING cities TYPE IMap OPTIONS ('keyFormat'='varchar', 'valueFormat'='varchar')",
        &[],
    )
    .await
    .unwrap();
    grid.execute(
        "INSERT INTO cities VALUES ('Australia', 'Canberra'), ('United States', 'Washington, DC')",
        &[],
    )
    .await
    .unwrap();
    grid
}

#[tokio::test]
async fn test_select_by_key_parameter() {
    let grid = setup_grid().await;
    let rows: Vec<_> = grid
        .execute(
            "SELECT __key AS country, this AS city FROM cities WHERE __key = ?",
            &["United States".into()],
        )
        .await
        .unwrap()
        .collect();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("country").unwrap(), &Value::from("United States"));
    assert_eq!(rows[0].value("city").unwrap(), &Value::from("Washington, DC"));
}

#[tokio::test]
async fn test_numbered_parameters() {
    let grid = setup_grid().await;
    let rows: Vec<_> = grid
        .execute(
            "SELECT this FROM cities WHERE __key = $2 OR __key = $1 ORDER BY this",
            &["Australia".into(), "United States".into()],
        )
        .await
        .unwrap()
        .map(|r| r.into_values())
        .collect();
    assert_eq!(
        rows,
        vec![vec![Value::from("Canberra")], vec![Value::from("Washington, DC")]]
    );
}

#[tokio::test]
async fn test_insert_with_parameters() {
    let grid = setup_grid().await;
    grid.execute(
        "INSERT INTO cities VALUES (?, ?), (?, ?)",
        &[
            "Croatia".into(),
            "Zagreb".into(),
            "Turkey".into(),
            "Ankara".into(),
        ],
    )
    .await
    .unwrap();
    assert_eq!(
        grid.get_map("cities").get("Turkey").await.unwrap(),
        Some(Value::from("Ankara"))
    );
}

#[tokio::test]
async fn test_parameter_count_mismatch() {
    let grid = setup_grid().await;

    let err = grid
        .execute("SELECT * FROM cities WHERE __key = ?", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ParameterCount { expected: 1, actual: 0 }));

    let err = grid
        .execute(
            "SELECT * FROM cities WHERE __key = ?",
            &["a".into(), "b".into()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ParameterCount { expected: 1, actual: 2 }));

    let err = grid
        .execute("SELECT * FROM cities", &["unused".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ParameterCount { expected: 0, actual: 1 }));
}

#[tokio::test]
async fn test_parameter_type_mismatch() {
    let grid = setup_grid().await;

    let err = grid
        .execute("SELECT * FROM cities WHERE __key = ?", &[Value::Integer(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));

    let err = grid
        .execute("INSERT INTO cities VALUES (?, ?)", &["Peru".into(), Value::Integer(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));
    assert!(!grid.get_map("cities").contains_key("Peru").await.unwrap());
}

#[tokio::test]
async fn test_parameters_are_not_sql() {
    let grid = setup_grid().await;
    let rows: Vec<_> = grid
        .execute(
            "SELECT * FROM cities WHERE __key = ?",
            &["x' OR '1'='1".into()],
        )
        .await
        .unwrap()
        .collect();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_mixed_placeholder_styles_are_rejected() {
    let grid = setup_grid().await;
    let err = grid
        .execute(
            "SELECT * FROM cities WHERE __key = ? OR __key = $1",
            &["a".into()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ParseError(_)));
}
