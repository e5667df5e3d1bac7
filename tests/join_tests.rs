use memgrid::{DbError, Grid, Value};
use serde_json::json;

/// country (varchar → json-flat) and city (int → json-flat), both empty.
async fn create_mappings() -> Grid {
    let grid = Grid::new();
    grid.execute(
        "CREATE OR REPLACE MAPPING country (__key VARCHAR, isoCode VARCHAR, country VARCHAR)
         TYPE IMap OPTIONS ('keyFormat' = 'varchar', 'valueFormat' = 'json-flat')",
        &[],
    )
    .await
    .unwrap();
    grid.execute(
        "CREATE OR REPLACE MAPPING city (__key INT, country VARCHAR, city VARCHAR, population BIGINT)
         TYPE IMap OPTIONS ('keyFormat' = 'int', 'valueFormat' = 'json-flat')",
        &[],
    )
    .await
    .unwrap();
    grid
}

/// Both maps populated through the map API the way a client would write
/// JSON documents. City 2 has no matching country.
async fn setup_grid() -> Grid {
    let grid = create_mappings().await;

    let countries = grid.get_map("country");
    for (iso, name) in [("AU", "Australia"), ("EN", "England"), ("US", "United States")] {
        let doc = json!({ "isoCode": iso, "country": name });
        countries.set(iso, Value::from_json(&doc).unwrap()).await.unwrap();
    }

    let cities = grid.get_map("city");
    for (id, iso, city, population) in [
        (1, "AU", "Canberra", 354_644),
        (2, "CZ", "Prague", 1_227_332),
        (3, "EN", "London", 8_174_100),
        (4, "US", "Washington, DC", 601_723),
    ] {
        let doc = json!({ "country": iso, "city": city, "population": population });
        cities.set(id, Value::from_json(&doc).unwrap()).await.unwrap();
    }
    grid
}

async fn query(grid: &Grid, sql: &str) -> Vec<Vec<Value>> {
    grid.execute(sql, &[])
        .await
        .unwrap()
        .map(|row| row.into_values())
        .collect()
}

#[tokio::test]
async fn test_country_city_join() {
    let grid = setup_grid().await;

    let mut rows = query(
        &grid,
        "SELECT c.isoCode, c.country, t.city, t.population
         FROM country c
         JOIN city t ON c.isoCode = t.country",
    )
    .await;
    rows.sort();

    assert_eq!(
        rows,
        vec![
            vec![
                Value::from("AU"),
                Value::from("Australia"),
                Value::from("Canberra"),
                Value::Integer(354_644)
            ],
            vec![
                Value::from("EN"),
                Value::from("England"),
                Value::from("London"),
                Value::Integer(8_174_100)
            ],
            vec![
                Value::from("US"),
                Value::from("United States"),
                Value::from("Washington, DC"),
                Value::Integer(601_723)
            ],
        ]
    );
}

#[tokio::test]
async fn test_join_keeps_text_with_commas_intact() {
    let grid = create_mappings().await;
    let countries = grid.get_map("country");
    countries
        .set("AU", Value::from_json(&json!({ "isoCode": "AU", "country": "Australia" })).unwrap())
        .await
        .unwrap();
    countries
        .set("US", Value::from_json(&json!({ "isoCode": "US", "country": "United States" })).unwrap())
        .await
        .unwrap();
    let cities = grid.get_map("city");
    cities
        .set(1, Value::from_json(&json!({ "country": "AU", "city": "Canberra", "population": 354644 })).unwrap())
        .await
        .unwrap();
    cities
        .set(
            4,
            Value::from_json(&json!({ "country": "US", "city": "Washington, DC", "population": 601723 })).unwrap(),
        )
        .await
        .unwrap();

    let mut rows = query(
        &grid,
        "SELECT c.isoCode, c.country, t.city, t.population FROM country c JOIN city t ON c.isoCode = t.country",
    )
    .await;
    rows.sort();

    assert_eq!(
        rows,
        vec![
            vec![
                Value::from("AU"),
                Value::from("Australia"),
                Value::from("Canberra"),
                Value::Integer(354_644)
            ],
            vec![
                Value::from("US"),
                Value::from("United States"),
                Value::from("Washington, DC"),
                Value::Integer(601_723)
            ],
        ]
    );
}

#[tokio::test]
async fn test_join_condition_order_does_not_matter() {
    let grid = setup_grid().await;
    let rows = query(
        &grid,
        "SELECT t.city FROM country c INNER JOIN city t ON t.country = c.isoCode ORDER BY t.city",
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Canberra")],
            vec![Value::from("London")],
            vec![Value::from("Washington, DC")]
        ]
    );
}

#[tokio::test]
async fn test_left_join_keeps_unmatched_rows() {
    let grid = setup_grid().await;
    let rows = query(
        &grid,
        "SELECT t.city, c.country FROM city t LEFT JOIN country c ON t.country = c.isoCode
         ORDER BY t.city",
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Canberra"), Value::from("Australia")],
            vec![Value::from("London"), Value::from("England")],
            vec![Value::from("Prague"), Value::Null],
            vec![Value::from("Washington, DC"), Value::from("United States")],
        ]
    );
}

#[tokio::test]
async fn test_join_with_where_and_wildcard() {
    let grid = setup_grid().await;
    let cursor = grid
        .execute(
            "SELECT * FROM country c JOIN city t ON c.isoCode = t.country WHERE t.population > 1000000",
            &[],
        )
        .await
        .unwrap();
    let names: Vec<_> = cursor
        .row_metadata()
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(
        names,
        vec!["__key", "isoCode", "country", "__key", "country", "city", "population"]
    );

    let rows: Vec<_> = cursor.map(|r| r.into_values()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][5], Value::from("London"));
}

#[tokio::test]
async fn test_ambiguous_column_is_rejected() {
    let grid = setup_grid().await;
    let err = grid
        .execute(
            "SELECT country FROM country c JOIN city t ON c.isoCode = t.country",
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ParseError(_)));
}

#[tokio::test]
async fn test_non_equi_join_is_rejected() {
    let grid = setup_grid().await;
    for sql in [
        "SELECT * FROM country c JOIN city t ON c.isoCode < t.country",
        "SELECT * FROM country c JOIN city t ON c.isoCode = t.country AND t.city = 'London'",
        "SELECT * FROM country c JOIN city t ON c.isoCode = c.country",
        "SELECT * FROM country c JOIN city t ON c.isoCode = 'AU'",
    ] {
        let err = grid.execute(sql, &[]).await.unwrap_err();
        assert!(matches!(err, DbError::ParseError(_)), "{} -> {:?}", sql, err);
    }
}

#[tokio::test]
async fn test_join_type_mismatch() {
    let grid = setup_grid().await;
    let err = grid
        .execute(
            "SELECT * FROM country c JOIN city t ON c.isoCode = t.population",
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));
}
