mod load_test;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memgrid::{Cursor, Grid, GridConfig, Value};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::load_test::{LoadTestConfig, run_load_test};

#[derive(Parser)]
#[command(name = "memgrid")]
#[command(about = "Demo client for the memgrid in-memory data grid")]
struct Cli {
    /// Grid configuration: a URL such as memgrid://dev?statement_timeout_ms=500
    /// or the path of a JSON config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Populate the `cities` map with JSON records and print its size
    Map,
    /// Mapping, clear, insert and select over `cities`
    Sql {
        /// Country looked up by the parameterized select
        #[arg(long, default_value = "United States")]
        country: String,
    },
    /// json-flat mappings, parameterized select and a join
    Json {
        /// ISO code looked up by the parameterized select
        #[arg(long, default_value = "AU")]
        iso_code: String,
    },
    /// Random puts and gets against one map
    Load {
        #[arg(long, default_value_t = 100_000)]
        iterations: u64,
        #[arg(long, default_value_t = 100_000)]
        key_space: u64,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long, default_value_t = 10)]
        report_every: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memgrid=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(url) if url.starts_with("memgrid://") => {
            GridConfig::from_url(url).context("Invalid --config")?
        }
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file {}", path))?;
            GridConfig::from_json(&json).context("Invalid --config")?
        }
        None => GridConfig::default(),
    };
    let grid = Grid::with_config(config)?;
    println!("Connection Successful!");

    match cli.command {
        Command::Map => map_example(&grid).await?,
        Command::Sql { country } => sql_example(&grid, &country).await?,
        Command::Json { iso_code } => json_example(&grid, &iso_code).await?,
        Command::Load {
            iterations,
            key_space,
            concurrency,
            report_every,
        } => {
            let config = LoadTestConfig {
                map_name: "map".to_string(),
                iterations,
                key_space,
                concurrency,
                report_every,
                sample_max: 100_000,
            };
            run_load_test(&grid, &config).await?.print();
        }
    }

    grid.shutdown()?;
    Ok(())
}

fn separator() {
    println!("--------------------");
}

async fn map_example(grid: &Grid) -> Result<()> {
    let cities = grid.get_map("cities");
    let records = [
        ("United Kingdom", "London", 9_540_576),
        ("United Kingdom", "Manchester", 2_770_434),
        ("United States", "New York", 19_223_191),
        ("United States", "Los Angeles", 3_985_520),
        ("Turkey", "Ankara", 5_309_690),
        ("Turkey", "Istanbul", 15_636_243),
        ("Brazil", "Sao Paulo", 22_429_800),
        ("Brazil", "Rio de Janeiro", 13_635_274),
    ];
    for (id, (country, city, population)) in records.into_iter().enumerate() {
        let doc = json!({ "country": country, "city": city, "population": population });
        cities.put(id as i64 + 1, Value::from_json(&doc)?).await?;
    }

    println!("'cities' map now contains {} entries.", cities.size().await?);
    separator();
    Ok(())
}

async fn sql_example(grid: &Grid, country: &str) -> Result<()> {
    println!("Creating a mapping...");
    grid.execute(
        "CREATE OR REPLACE MAPPING cities TYPE IMap
         OPTIONS ('keyFormat'='varchar', 'valueFormat'='varchar')",
        &[],
    )
    .await?;
    println!("The mapping has been created successfully.");
    separator();

    println!("Deleting data via SQL...");
    grid.execute("DELETE FROM cities", &[]).await?;
    println!("The data has been deleted successfully.");
    separator();

    println!("Inserting data via SQL...");
    grid.execute(
        "INSERT INTO cities VALUES
            ('Australia', 'Canberra'),
            ('Croatia', 'Zagreb'),
            ('Czech Republic', 'Prague'),
            ('England', 'London'),
            ('Turkey', 'Ankara'),
            ('United States', 'Washington, DC')",
        &[],
    )
    .await?;
    println!("The data has been inserted successfully.");
    separator();

    println!("Retrieving all the data via SQL...");
    for row in grid.execute("SELECT * FROM cities", &[]).await? {
        println!("{} - {}", row.value(0)?, row.value(1)?);
    }
    separator();

    println!("Retrieving a city name via SQL...");
    let cursor = grid
        .execute(
            "SELECT __key AS country, this AS city FROM cities WHERE __key = ?",
            &[country.into()],
        )
        .await?;
    for row in cursor {
        println!(
            "Country name: {}; City name: {}",
            row.value("country")?,
            row.value("city")?
        );
    }
    separator();
    Ok(())
}

async fn json_example(grid: &Grid, iso_code: &str) -> Result<()> {
    println!("Creating mapping for countries...");
    grid.execute(
        "CREATE OR REPLACE MAPPING country (
            __key VARCHAR,
            isoCode VARCHAR,
            country VARCHAR
        ) TYPE IMap OPTIONS ('keyFormat' = 'varchar', 'valueFormat' = 'json-flat')",
        &[],
    )
    .await?;
    separator();

    println!("Populating 'country' map with JSON values...");
    let countries = grid.get_map("country");
    for (iso, name) in [
        ("AU", "Australia"),
        ("EN", "England"),
        ("US", "United States"),
        ("CZ", "Czech Republic"),
    ] {
        let doc = json!({ "isoCode": iso, "country": name });
        countries.set(iso, Value::from_json(&doc)?).await?;
    }
    separator();

    let query = "SELECT c.country FROM country c";
    println!("Select all countries with sql = {}", query);
    for row in grid.execute(query, &[]).await? {
        println!("country = {}", row.value("country")?);
    }
    separator();

    println!("Creating mapping for cities...");
    grid.execute(
        "CREATE OR REPLACE MAPPING city (
            __key INT,
            country VARCHAR,
            city VARCHAR,
            population BIGINT
        ) TYPE IMap OPTIONS ('keyFormat' = 'int', 'valueFormat' = 'json-flat')",
        &[],
    )
    .await?;
    separator();

    println!("Populating 'city' map with JSON values...");
    let cities = grid.get_map("city");
    for (id, country, city, population) in [
        (1, "AU", "Canberra", 354_644),
        (2, "CZ", "Prague", 1_227_332),
        (3, "EN", "London", 8_174_100),
        (4, "US", "Washington, DC", 601_723),
    ] {
        let doc = json!({ "country": country, "city": city, "population": population });
        cities.set(id, Value::from_json(&doc)?).await?;
    }
    separator();

    let query = "SELECT city, population FROM city WHERE country = ?";
    println!("Select city and population with sql = {}", query);
    for row in grid.execute(query, &[iso_code.into()]).await? {
        println!(
            "city = {}, population = {}",
            row.value("city")?,
            row.value("population")?
        );
    }
    separator();

    println!("Select country and city data in query that joins tables");
    let cursor = grid
        .execute(
            "SELECT c.isoCode, c.country, t.city, t.population
             FROM country c
             JOIN city t ON c.isoCode = t.country",
            &[],
        )
        .await?;
    print_table(cursor);
    separator();
    Ok(())
}

fn print_table(cursor: Cursor) {
    let headers: Vec<String> = cursor
        .row_metadata()
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let rows: Vec<Vec<String>> = cursor
        .map(|row| row.values().iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        println!("| {} |", padded.join(" | "));
    };
    line(&headers);
    println!(
        "|{}|",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("|")
    );
    for row in &rows {
        line(row);
    }
}
