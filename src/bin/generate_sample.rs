//! Writes a synthetic, one-hot-encoded listings dataset (CSV + Parquet) and a
//! matching coefficient file into the directory given as first argument.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rent_scope::data::model::{ScalarField, KNOWN_AMENITIES};

const LISTINGS: usize = 2_000;

/// (state, city, latitude, longitude, city premium)
const CITIES: &[(&str, &str, f64, f64, f64)] = &[
    ("CA", "San Francisco", 37.77, -122.42, 900.0),
    ("CA", "Los Angeles", 34.05, -118.24, 600.0),
    ("CA", "San Diego", 32.72, -117.16, 400.0),
    ("NY", "New York", 40.71, -74.01, 1000.0),
    ("NY", "Buffalo", 42.89, -78.88, -250.0),
    ("TX", "Austin", 30.27, -97.74, 150.0),
    ("TX", "Houston", 29.76, -95.37, -100.0),
    ("WA", "Seattle", 47.61, -122.33, 500.0),
];
const SOURCES: &[&str] = &["RentLingo", "Listanza", "RentDigs.com"];
const PETS: &[&str] = &["Cats", "Cats,Dogs", "Dogs", "No permitido"];
const PHOTOS: &[&str] = &["No", "Thumbnail", "Yes"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Column-major table: every column is a `Vec<f64>`.
struct Table {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Table {
    fn new(headers: Vec<String>) -> Self {
        let columns = vec![Vec::with_capacity(LISTINGS); headers.len()];
        Self { headers, columns }
    }

    fn push_row(&mut self, row: Vec<f64>) {
        for (col, v) in self.columns.iter_mut().zip(row) {
            col.push(v);
        }
    }

    /// Scalars stay Float64, indicator and amenity columns become Int64.
    fn is_scalar(&self, col: usize) -> bool {
        col < ScalarField::COUNT
    }
}

fn headers() -> Vec<String> {
    let mut h: Vec<String> = [
        "price",
        "bathrooms",
        "bedrooms",
        "square_feet",
        "longitud_descripcion",
        "latitude",
        "longitude",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut states: Vec<&str> = CITIES.iter().map(|c| c.0).collect();
    states.dedup();
    h.extend(states.iter().map(|s| format!("state_{s}")));
    h.extend(CITIES.iter().map(|c| format!("cityname_{}", c.1)));
    h.extend(SOURCES.iter().map(|s| format!("source_{s}")));
    h.extend(PETS.iter().map(|p| format!("pets_allowed_{p}")));
    h.extend(PHOTOS.iter().map(|p| format!("has_photo_{p}")));
    h.extend(KNOWN_AMENITIES.iter().map(|a| a.to_string()));
    h
}

fn one_hot(len: usize, hot: usize) -> impl Iterator<Item = f64> {
    (0..len).map(move |i| if i == hot { 1.0 } else { 0.0 })
}

fn generate(rng: &mut SimpleRng) -> Table {
    let mut table = Table::new(headers());
    let mut states: Vec<&str> = CITIES.iter().map(|c| c.0).collect();
    states.dedup();

    for _ in 0..LISTINGS {
        let city = rng.below(CITIES.len());
        let (state, _, lat, lon, premium) = CITIES[city];
        let bathrooms = 1.0 + rng.below(3) as f64;
        let bedrooms = (bathrooms + rng.below(2) as f64).max(1.0);
        let square_feet = (300.0 + bedrooms * 250.0 + rng.gauss(0.0, 120.0)).round().max(150.0);
        let amenities: Vec<bool> = KNOWN_AMENITIES.iter().map(|_| rng.chance(0.3)).collect();
        let amenity_bonus: f64 = KNOWN_AMENITIES
            .iter()
            .zip(&amenities)
            .filter(|(_, on)| **on)
            .map(|(a, _)| match *a {
                "Elevator" => 250.0,
                "Parking" => 160.0,
                "Pool" => 90.0,
                "Playground" => -85.0,
                _ => 10.0,
            })
            .sum();
        let price = (bathrooms * 297.0 + square_feet * 0.63 + premium + amenity_bonus + rng.gauss(200.0, 150.0))
            .round()
            .max(300.0);

        let state_idx = states.iter().position(|s| *s == state).unwrap_or(0);
        let mut row = vec![
            price,
            bathrooms,
            bedrooms,
            square_feet,
            (80.0 + rng.next_f64() * 900.0).round(),
            lat + rng.gauss(0.0, 0.05),
            lon + rng.gauss(0.0, 0.05),
        ];
        row.extend(one_hot(states.len(), state_idx));
        row.extend(one_hot(CITIES.len(), city));
        row.extend(one_hot(SOURCES.len(), rng.below(SOURCES.len())));
        row.extend(one_hot(PETS.len(), rng.below(PETS.len())));
        row.extend(one_hot(PHOTOS.len(), rng.below(PHOTOS.len())));
        row.extend(amenities.iter().map(|&on| if on { 1.0 } else { 0.0 }));
        table.push_row(row);
    }
    table
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(&table.headers)?;
    for row in 0..LISTINGS {
        writer.write_record(table.columns.iter().enumerate().map(|(col, values)| {
            if table.is_scalar(col) {
                values[row].to_string()
            } else {
                format!("{}", values[row] as i64)
            }
        }))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let fields: Vec<Field> = table
        .headers
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let dtype = if table.is_scalar(col) { DataType::Float64 } else { DataType::Int64 };
            Field::new(name, dtype, false)
        })
        .collect();
    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .enumerate()
        .map(|(col, values)| -> ArrayRef {
            if table.is_scalar(col) {
                Arc::new(Float64Array::from(values.clone()))
            } else {
                Arc::new(Int64Array::from(values.iter().map(|v| *v as i64).collect::<Vec<_>>()))
            }
        })
        .collect();

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_coefficients(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating coefficient CSV")?;
    writer.write_record(["Variables", "Coeficientes"])?;
    writer.write_record(["bathrooms", "297"])?;
    writer.write_record(["square_feet", "0.63"])?;
    for (_, city, _, _, premium) in CITIES {
        writer.write_record([format!("cityname_{city}"), premium.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir).context("creating output directory")?;

    let mut rng = SimpleRng::new(42);
    let table = generate(&mut rng);

    let csv_path = out_dir.join("listings.csv");
    let parquet_path = out_dir.join("listings.parquet");
    let coef_path = out_dir.join("coefficients.csv");
    write_csv(&table, &csv_path)?;
    write_parquet(&table, &parquet_path)?;
    write_coefficients(&coef_path)?;

    println!(
        "Wrote {LISTINGS} listings ({} columns) to {} and {}, coefficients to {}",
        table.headers.len(),
        csv_path.display(),
        parquet_path.display(),
        coef_path.display()
    );
    Ok(())
}
