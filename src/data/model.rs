use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::onehot::{GroupKind, GroupMember, OneHotGroup};

// ---------------------------------------------------------------------------
// Cell – a single raw value as handed over by a loader
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes found in the
/// prepared listings files (integers, floats, booleans, text).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl Cell {
    /// Interpret the value as an `f64` for scalar columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Integer(i) => Some(*i as f64),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Null => None,
        }
    }

    /// Interpret the value as a 0/1 indicator.
    ///
    /// Accepts `0`/`1`, `0.0`/`1.0` and `true`/`false`; any other value is
    /// not an indicator.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Integer(0) => Some(false),
            Cell::Integer(1) => Some(true),
            Cell::Float(v) if *v == 0.0 => Some(false),
            Cell::Float(v) if *v == 1.0 => Some(true),
            Cell::Text(s) => match s.trim() {
                "0" | "0.0" | "false" | "False" => Some(false),
                "1" | "1.0" | "true" | "True" => Some(true),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Column layout – which headers mean what
// ---------------------------------------------------------------------------

/// Amenity columns of the prepared listings dataset, in chart order.
pub const KNOWN_AMENITIES: &[&str] = &[
    "TV",
    "Dishwasher",
    "Wood Floors",
    "Elevator",
    "Clubhouse",
    "Doorman",
    "Parking",
    "Patio/Deck",
    "Luxury",
    "Storage",
    "View",
    "Refrigerator",
    "Playground",
    "Internet Access",
    "Tennis",
    "Gated",
    "Basketball",
    "Golf",
    "Garbage Disposal",
    "AC",
    "Gym",
    "Washer Dryer",
    "Pool",
    "Alarm",
    "Hot Tub",
    "Fireplace",
    "Cable or Satellite",
];

/// Scalar numeric fields every listing carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarField {
    Price,
    Bathrooms,
    Bedrooms,
    SquareFeet,
    DescriptionLength,
    Latitude,
    Longitude,
}

impl ScalarField {
    pub const COUNT: usize = 7;

    pub fn all() -> &'static [ScalarField] {
        &[
            ScalarField::Price,
            ScalarField::Bathrooms,
            ScalarField::Bedrooms,
            ScalarField::SquareFeet,
            ScalarField::DescriptionLength,
            ScalarField::Latitude,
            ScalarField::Longitude,
        ]
    }

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        self.aliases()[0]
    }

    /// Header names accepted for this field. The prepared dataset names the
    /// description length in Spanish.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ScalarField::Price => &["price"],
            ScalarField::Bathrooms => &["bathrooms"],
            ScalarField::Bedrooms => &["bedrooms"],
            ScalarField::SquareFeet => &["square_feet"],
            ScalarField::DescriptionLength => &["description_length", "longitud_descripcion"],
            ScalarField::Latitude => &["latitude"],
            ScalarField::Longitude => &["longitude"],
        }
    }

    fn from_header(header: &str) -> Option<ScalarField> {
        ScalarField::all()
            .iter()
            .copied()
            .find(|f| f.aliases().contains(&header))
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Which amenity columns to pick up from the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub amenities: Vec<String>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            amenities: KNOWN_AMENITIES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl ColumnLayout {
    /// Layout with a custom amenity list.
    pub fn with_amenities<I, S>(amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            amenities: amenities.into_iter().map(Into::into).collect(),
        }
    }
}

/// Failures while turning a raw table into a [`Dataset`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("missing required column '{field}'")]
    MissingColumn { field: &'static str },

    #[error("row {row}: column '{column}' has value '{value}', expected a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: column '{column}' has value '{value}', expected 0 or 1")]
    InvalidIndicator {
        row: usize,
        column: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Schema – headers resolved once at load time
// ---------------------------------------------------------------------------

/// Resolved column meaning for one dataset.
///
/// One-hot groups and amenity flags are fixed here; nothing downstream scans
/// column names again.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// One-hot groups that have at least one column in the data.
    pub groups: BTreeMap<GroupKind, OneHotGroup>,
    /// Amenity names; position `i` matches `Listing::amenities[i]`.
    pub amenities: Vec<String>,
    /// Indicator column names; position `i` matches `Listing::indicators[i]`.
    pub indicator_columns: Vec<String>,
    amenity_lookup: HashMap<String, usize>,
    indicator_lookup: HashMap<String, usize>,
}

/// Source-table positions for every resolved column.
struct ColumnPositions {
    scalars: [usize; ScalarField::COUNT],
    indicators: Vec<usize>,
    amenities: Vec<usize>,
}

impl Schema {
    fn resolve(headers: &[String], layout: &ColumnLayout) -> Result<(Schema, ColumnPositions), TableError> {
        let mut scalars: [Option<usize>; ScalarField::COUNT] = [None; ScalarField::COUNT];
        let mut schema = Schema::default();
        let mut indicator_positions = Vec::new();

        for (pos, header) in headers.iter().enumerate() {
            if let Some(field) = ScalarField::from_header(header) {
                let slot = &mut scalars[field.slot()];
                if slot.is_none() {
                    *slot = Some(pos);
                }
                continue;
            }
            if let Some(kind) = GroupKind::from_header(header) {
                if schema.indicator_lookup.contains_key(header) {
                    log::warn!("duplicate indicator column '{header}' ignored");
                    continue;
                }
                let indicator = schema.indicator_columns.len();
                schema.indicator_columns.push(header.clone());
                schema.indicator_lookup.insert(header.clone(), indicator);
                indicator_positions.push(pos);
                schema
                    .groups
                    .entry(kind)
                    .or_insert_with(|| OneHotGroup::new(kind))
                    .push(GroupMember {
                        column: header.clone(),
                        label: header[kind.prefix().len()..].to_string(),
                        indicator,
                    });
                continue;
            }
            if !layout.amenities.iter().any(|a| a == header) {
                log::debug!("ignoring column '{header}'");
            }
        }

        let mut amenity_positions = Vec::new();
        for amenity in &layout.amenities {
            match headers.iter().position(|h| h == amenity) {
                Some(pos) => {
                    schema.amenity_lookup.insert(amenity.clone(), schema.amenities.len());
                    schema.amenities.push(amenity.clone());
                    amenity_positions.push(pos);
                }
                None => log::warn!("amenity column '{amenity}' not present in data"),
            }
        }

        let mut resolved = [0usize; ScalarField::COUNT];
        for field in ScalarField::all() {
            resolved[field.slot()] = scalars[field.slot()].ok_or(TableError::MissingColumn {
                field: field.name(),
            })?;
        }

        Ok((
            schema,
            ColumnPositions {
                scalars: resolved,
                indicators: indicator_positions,
                amenities: amenity_positions,
            },
        ))
    }

    /// The one-hot group of the given kind, if the data has any of its columns.
    pub fn group(&self, kind: GroupKind) -> Option<&OneHotGroup> {
        self.groups.get(&kind)
    }

    /// Position of an indicator column in `Listing::indicators`.
    pub fn indicator_index(&self, column: &str) -> Option<usize> {
        self.indicator_lookup.get(column).copied()
    }

    /// Position of an amenity in `Listing::amenities`.
    pub fn amenity_index(&self, amenity: &str) -> Option<usize> {
        self.amenity_lookup.get(amenity).copied()
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the table
// ---------------------------------------------------------------------------

/// A single rental listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Zero-based row number in the source table.
    pub id: usize,
    pub price: f64,
    pub bathrooms: f64,
    pub bedrooms: f64,
    pub square_feet: f64,
    pub description_length: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// One-hot indicator values, indexed like `Schema::indicator_columns`.
    pub indicators: Vec<bool>,
    /// Amenity flags, indexed like `Schema::amenities`.
    pub amenities: Vec<bool>,
}

impl Listing {
    pub fn indicator(&self, index: usize) -> bool {
        self.indicators.get(index).copied().unwrap_or(false)
    }

    pub fn has_amenity(&self, index: usize) -> bool {
        self.amenities.get(index).copied().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub schema: Schema,
    pub listings: Vec<Listing>,
}

impl Dataset {
    /// Build a dataset from a header row and raw cells.
    pub fn from_table(
        headers: &[String],
        rows: Vec<Vec<Cell>>,
        layout: &ColumnLayout,
    ) -> Result<Self, TableError> {
        let (schema, positions) = Schema::resolve(headers, layout)?;
        let mut listings = Vec::with_capacity(rows.len());

        for (row_no, cells) in rows.into_iter().enumerate() {
            let number = |pos: usize| -> Result<f64, TableError> {
                let cell = cells.get(pos).unwrap_or(&Cell::Null);
                cell.as_f64().ok_or_else(|| TableError::InvalidNumber {
                    row: row_no,
                    column: headers[pos].clone(),
                    value: cell.to_string(),
                })
            };
            let flag = |pos: usize| -> Result<bool, TableError> {
                let cell = cells.get(pos).unwrap_or(&Cell::Null);
                cell.as_flag().ok_or_else(|| TableError::InvalidIndicator {
                    row: row_no,
                    column: headers[pos].clone(),
                    value: cell.to_string(),
                })
            };
            let scalar = |field: ScalarField| number(positions.scalars[field.slot()]);

            listings.push(Listing {
                id: row_no,
                price: scalar(ScalarField::Price)?,
                bathrooms: scalar(ScalarField::Bathrooms)?,
                bedrooms: scalar(ScalarField::Bedrooms)?,
                square_feet: scalar(ScalarField::SquareFeet)?,
                description_length: scalar(ScalarField::DescriptionLength)?,
                latitude: scalar(ScalarField::Latitude)?,
                longitude: scalar(ScalarField::Longitude)?,
                indicators: positions
                    .indicators
                    .iter()
                    .map(|&pos| flag(pos))
                    .collect::<Result<_, _>>()?,
                amenities: positions
                    .amenities
                    .iter()
                    .map(|&pos| flag(pos))
                    .collect::<Result<_, _>>()?,
            });
        }

        Ok(Dataset { schema, listings })
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Smallest and largest `square_feet`, the default size-filter range.
    pub fn square_feet_bounds(&self) -> Option<(f64, f64)> {
        self.listings.iter().fold(None, |acc, l| match acc {
            None => Some((l.square_feet, l.square_feet)),
            Some((lo, hi)) => Some((lo.min(l.square_feet), hi.max(l.square_feet))),
        })
    }

    /// Number of listings per group that do not have exactly one active
    /// indicator column. Only groups with problems are returned.
    pub fn integrity_report(&self) -> Vec<(GroupKind, usize)> {
        self.schema
            .groups
            .values()
            .filter_map(|group| {
                let malformed = self
                    .listings
                    .iter()
                    .filter(|l| group.decode(l).is_err())
                    .count();
                (malformed > 0).then_some((group.kind, malformed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const BASE: &[&str] = &[
        "price",
        "bathrooms",
        "bedrooms",
        "square_feet",
        "longitud_descripcion",
        "latitude",
        "longitude",
    ];

    fn base_row(price: f64) -> Vec<Cell> {
        vec![
            Cell::Float(price),
            Cell::Integer(1),
            Cell::Integer(1),
            Cell::Integer(700),
            Cell::Integer(120),
            Cell::Float(37.7),
            Cell::Float(-122.4),
        ]
    }

    #[test]
    fn test_resolves_groups_and_amenities() {
        let mut names = BASE.to_vec();
        names.extend(["state_CA", "state_NY", "Pool", "unrelated", "has_photo_Yes"]);
        let mut row = base_row(1500.0);
        row.extend([
            Cell::Integer(1),
            Cell::Integer(0),
            Cell::Text("1".into()),
            Cell::Text("whatever".into()),
            Cell::Bool(true),
        ]);

        let ds = Dataset::from_table(&headers(&names), vec![row], &ColumnLayout::with_amenities(["Pool", "Gym"]))
            .unwrap();

        let state = ds.schema.group(GroupKind::State).unwrap();
        let labels: Vec<_> = state.labels().collect();
        assert_eq!(labels, vec!["CA", "NY"]);
        assert_eq!(ds.schema.amenities, vec!["Pool".to_string()]);
        assert!(ds.schema.group(GroupKind::Pets).is_none());
        assert_eq!(ds.listings[0].description_length, 120.0);
        assert!(ds.listings[0].has_amenity(0));
        assert!(ds.integrity_report().is_empty());
    }

    #[test]
    fn test_missing_scalar_column() {
        let names = headers(&["price", "bathrooms"]);
        let err = Dataset::from_table(&names, vec![], &ColumnLayout::default()).unwrap_err();
        assert_eq!(err, TableError::MissingColumn { field: "bedrooms" });
    }

    #[test]
    fn test_invalid_indicator_cell() {
        let mut names = BASE.to_vec();
        names.push("state_CA");
        let mut row = base_row(900.0);
        row.push(Cell::Integer(2));
        let err = Dataset::from_table(&headers(&names), vec![row], &ColumnLayout::default()).unwrap_err();
        assert!(matches!(err, TableError::InvalidIndicator { row: 0, .. }));
    }

    #[test]
    fn test_integrity_report_counts_malformed_rows() {
        let mut names = BASE.to_vec();
        names.extend(["state_CA", "state_NY"]);
        let mut ok = base_row(1000.0);
        ok.extend([Cell::Integer(0), Cell::Integer(1)]);
        let mut both = base_row(1100.0);
        both.extend([Cell::Integer(1), Cell::Integer(1)]);
        let mut none = base_row(1200.0);
        none.extend([Cell::Integer(0), Cell::Integer(0)]);

        let ds = Dataset::from_table(&headers(&names), vec![ok, both, none], &ColumnLayout::default()).unwrap();
        assert_eq!(ds.integrity_report(), vec![(GroupKind::State, 2)]);
    }

    #[test]
    fn test_square_feet_bounds() {
        assert_eq!(Dataset::default().square_feet_bounds(), None);
        let names = headers(BASE);
        let mut small = base_row(800.0);
        small[3] = Cell::Integer(450);
        let mut large = base_row(2500.0);
        large[3] = Cell::Float(1800.5);
        let ds = Dataset::from_table(&names, vec![small, large], &ColumnLayout::default()).unwrap();
        assert_eq!(ds.square_feet_bounds(), Some((450.0, 1800.5)));
    }
}
