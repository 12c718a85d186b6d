//! Statistics derived from a [`FilteredView`].
//!
//! Every function takes the view by reference and is independent of the
//! others; callers compute all of them from the same view so the numbers on
//! screen always describe the same rows.

use serde::Serialize;

use super::filter::FilteredView;
use super::model::Listing;
use super::onehot::{DecodeError, GroupKind};

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Headline numbers for a view. Averages are `None` on an empty view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub listing_count: usize,
    pub average_price: Option<f64>,
    pub average_description_length: Option<f64>,
    /// Sum over all city indicator columns of the active cells in the view.
    /// Equals `listing_count` when every listing has exactly one city.
    pub city_coverage_count: u64,
}

pub fn kpis(view: &FilteredView<'_>) -> Kpis {
    let city_indicators: Vec<usize> = view
        .schema()
        .group(GroupKind::City)
        .map(|g| g.members.iter().map(|m| m.indicator).collect())
        .unwrap_or_default();

    let mut price_sum = 0.0;
    let mut description_sum = 0.0;
    let mut city_coverage_count = 0u64;
    for listing in view.listings() {
        price_sum += listing.price;
        description_sum += listing.description_length;
        city_coverage_count += city_indicators
            .iter()
            .filter(|&&i| listing.indicator(i))
            .count() as u64;
    }

    let n = view.len();
    Kpis {
        listing_count: n,
        average_price: mean_of(price_sum, n),
        average_description_length: mean_of(description_sum, n),
        city_coverage_count,
    }
}

fn mean_of(sum: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Grouped price statistics (boxplots)
// ---------------------------------------------------------------------------

/// Categorical axes available for grouped price statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupingAxis {
    PhotoPresence,
    PetsPolicy,
}

impl GroupingAxis {
    pub fn all() -> &'static [GroupingAxis] {
        &[GroupingAxis::PhotoPresence, GroupingAxis::PetsPolicy]
    }

    /// Parse the selector key used by the dashboard (`photos` / `pets`).
    pub fn from_key(key: &str) -> Option<GroupingAxis> {
        GroupingAxis::all().iter().copied().find(|a| a.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            GroupingAxis::PhotoPresence => "photos",
            GroupingAxis::PetsPolicy => "pets",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GroupingAxis::PhotoPresence => "Price by photo presence",
            GroupingAxis::PetsPolicy => "Price by pets policy",
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        match self {
            GroupingAxis::PhotoPresence => GroupKind::Photo,
            GroupingAxis::PetsPolicy => GroupKind::Pets,
        }
    }
}

/// Min / quartiles / max of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    /// Summary of an ascending-sorted, non-empty sample.
    fn from_sorted(sorted: &[f64]) -> Option<Self> {
        Some(Self {
            min: *sorted.first()?,
            q1: quantile(sorted, 0.25)?,
            median: quantile(sorted, 0.5)?,
            q3: quantile(sorted, 0.75)?,
            max: *sorted.last()?,
        })
    }
}

/// Quantile of an ascending-sorted sample with linear interpolation between
/// closest ranks.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Prices of one category of a grouping axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDistribution {
    pub label: String,
    /// All prices of the category, ascending.
    pub prices: Vec<f64>,
    pub summary: FiveNumberSummary,
}

impl CategoryDistribution {
    pub fn count(&self) -> usize {
        self.prices.len()
    }
}

/// Outcome of [`grouped_price_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupedPriceStats {
    Grouped {
        axis: GroupingAxis,
        categories: Vec<CategoryDistribution>,
    },
    /// The requested axis is unknown, or the data has no columns for it.
    UnsupportedAxis { requested: String },
}

impl GroupedPriceStats {
    /// Total listings across all categories.
    pub fn total(&self) -> usize {
        match self {
            GroupedPriceStats::Grouped { categories, .. } => {
                categories.iter().map(CategoryDistribution::count).sum()
            }
            GroupedPriceStats::UnsupportedAxis { .. } => 0,
        }
    }
}

/// Price distribution per category of the axis named by `axis_key`.
///
/// Each listing is decoded into exactly one category; a listing whose
/// indicator columns are malformed fails the whole computation.
pub fn grouped_price_stats(
    view: &FilteredView<'_>,
    axis_key: &str,
) -> Result<GroupedPriceStats, DecodeError> {
    let Some(axis) = GroupingAxis::from_key(axis_key) else {
        return Ok(GroupedPriceStats::UnsupportedAxis {
            requested: axis_key.to_string(),
        });
    };
    let Some(group) = view.schema().group(axis.group_kind()) else {
        log::warn!("dataset has no '{}' columns", axis.group_kind().prefix());
        return Ok(GroupedPriceStats::UnsupportedAxis {
            requested: axis_key.to_string(),
        });
    };

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); group.members.len()];
    for listing in view.listings() {
        let pos = group.decode_position(listing)?;
        buckets[pos].push(listing.price);
    }

    let categories = group
        .members
        .iter()
        .zip(buckets)
        .filter_map(|(member, mut prices)| {
            prices.sort_by(f64::total_cmp);
            let summary = FiveNumberSummary::from_sorted(&prices)?;
            Some(CategoryDistribution {
                label: member.label.clone(),
                prices,
                summary,
            })
        })
        .collect();

    Ok(GroupedPriceStats::Grouped { axis, categories })
}

// ---------------------------------------------------------------------------
// Amenity / price correlation
// ---------------------------------------------------------------------------

/// Why a correlation could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UndefinedReason {
    TooFewRows,
    ConstantAmenity,
    ConstantPrice,
    UnknownAmenity,
}

/// Pearson coefficient, or an explicit marker when it is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Correlation {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Correlation {
    pub fn value(&self) -> Option<f64> {
        match self {
            Correlation::Defined(r) => Some(*r),
            Correlation::Undefined(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenityCorrelation {
    pub amenity: String,
    pub correlation: Correlation,
}

/// Amenity names to report on: `subset`, or every amenity of the schema when
/// `subset` is empty.
fn amenity_names(view: &FilteredView<'_>, subset: &[String]) -> Vec<String> {
    if subset.is_empty() {
        view.schema().amenities.clone()
    } else {
        subset.to_vec()
    }
}

/// Pearson correlation between each amenity flag and price over the view.
pub fn amenity_price_correlation(view: &FilteredView<'_>, subset: &[String]) -> Vec<AmenityCorrelation> {
    let prices: Vec<f64> = view.listings().map(|l| l.price).collect();

    amenity_names(view, subset)
        .into_iter()
        .map(|amenity| {
            let correlation = match view.schema().amenity_index(&amenity) {
                None => Correlation::Undefined(UndefinedReason::UnknownAmenity),
                Some(index) => {
                    let flags: Vec<f64> = view
                        .listings()
                        .map(|l| if l.has_amenity(index) { 1.0 } else { 0.0 })
                        .collect();
                    pearson(&flags, &prices)
                }
            };
            AmenityCorrelation {
                amenity,
                correlation,
            }
        })
        .collect()
}

/// Pearson correlation of two equally long samples.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Correlation::Undefined(UndefinedReason::TooFewRows);
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if is_constant(var_x, mean_x, n) {
        return Correlation::Undefined(UndefinedReason::ConstantAmenity);
    }
    if is_constant(var_y, mean_y, n) {
        return Correlation::Undefined(UndefinedReason::ConstantPrice);
    }
    Correlation::Defined((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Sum of squared deviations indistinguishable from rounding noise around
/// `mean`.
fn is_constant(sum_sq: f64, mean: f64, n: usize) -> bool {
    sum_sq <= f64::EPSILON * n as f64 * mean * mean
}

// ---------------------------------------------------------------------------
// Map points, city summary, amenity averages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub price: f64,
}

/// Location and price of every listing in the view, for the price map.
pub fn price_points(view: &FilteredView<'_>) -> Vec<MapPoint> {
    view.listings()
        .map(|l| MapPoint {
            longitude: l.longitude,
            latitude: l.latitude,
            price: l.price,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub label: String,
    pub column: String,
    pub listings: usize,
    pub average_price: f64,
}

/// Per-city listing counts plus the listings no single city column claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityPriceSummary {
    /// Busiest city first.
    pub cities: Vec<CitySummary>,
    /// Listings with zero or several active city columns (e.g. the dropped
    /// reference category of a drop-first encoding).
    pub unresolved: usize,
}

/// Listing count and average price per city present in the view, busiest
/// city first. Listings without exactly one active city are counted in
/// `unresolved` instead of failing the summary.
pub fn city_price_summary(view: &FilteredView<'_>) -> CityPriceSummary {
    let Some(group) = view.schema().group(GroupKind::City) else {
        return CityPriceSummary {
            cities: Vec::new(),
            unresolved: view.len(),
        };
    };

    let mut totals = vec![(0usize, 0.0f64); group.members.len()];
    let mut unresolved = 0usize;
    for listing in view.listings() {
        match group.decode_position(listing) {
            Ok(pos) => {
                totals[pos].0 += 1;
                totals[pos].1 += listing.price;
            }
            Err(_) => unresolved += 1,
        }
    }
    if unresolved > 0 {
        log::debug!("{unresolved} listings have no single city column");
    }

    let mut cities: Vec<CitySummary> = group
        .members
        .iter()
        .zip(totals)
        .filter(|(_, (count, _))| *count > 0)
        .map(|(member, (count, sum))| CitySummary {
            label: member.label.clone(),
            column: member.column.clone(),
            listings: count,
            average_price: sum / count as f64,
        })
        .collect();
    cities.sort_by(|a, b| b.listings.cmp(&a.listings).then_with(|| a.label.cmp(&b.label)));
    CityPriceSummary { cities, unresolved }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenityAverage {
    pub amenity: String,
    pub listings: usize,
    pub average_price: Option<f64>,
}

/// Average price of the listings in the view that have each amenity.
pub fn amenity_average_prices(view: &FilteredView<'_>, subset: &[String]) -> Vec<AmenityAverage> {
    amenity_names(view, subset)
        .into_iter()
        .map(|amenity| {
            let with: Vec<&Listing> = match view.schema().amenity_index(&amenity) {
                Some(index) => view.listings().filter(|l| l.has_amenity(index)).collect(),
                None => Vec::new(),
            };
            let sum: f64 = with.iter().map(|l| l.price).sum();
            AmenityAverage {
                amenity,
                listings: with.len(),
                average_price: mean_of(sum, with.len()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterCriteria};
    use crate::data::model::{Cell, ColumnLayout, Dataset};

    const HEADERS: &[&str] = &[
        "price",
        "bathrooms",
        "bedrooms",
        "square_feet",
        "description_length",
        "latitude",
        "longitude",
        "cityname_Austin",
        "cityname_Denver",
        "has_photo_No",
        "has_photo_Yes",
        "pets_allowed_Cats",
        "pets_allowed_No permitido",
        "Pool",
        "Gym",
    ];

    /// price, description length, austin, denver, photo_no, photo_yes, cats, no_pets, pool, gym
    fn dataset(rows: &[[f64; 10]]) -> Dataset {
        let headers: Vec<String> = HEADERS.iter().map(|s| s.to_string()).collect();
        let table = rows
            .iter()
            .map(|r| {
                [r[0], 1.0, 1.0, 700.0, r[1], 30.0, -97.0, r[2], r[3], r[4], r[5], r[6], r[7], r[8], r[9]]
                    .into_iter()
                    .map(Cell::Float)
                    .collect()
            })
            .collect();
        Dataset::from_table(&headers, table, &ColumnLayout::with_amenities(["Pool", "Gym"])).unwrap()
    }

    fn sample() -> Dataset {
        dataset(&[
            [1000.0, 100.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
            [1500.0, 200.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            [2000.0, 300.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0],
            [3000.0, 400.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn test_kpis() {
        let ds = sample();
        let k = kpis(&apply(&ds, &FilterCriteria::default()));
        assert_eq!(k.listing_count, 4);
        assert_eq!(k.average_price, Some(1875.0));
        assert_eq!(k.average_description_length, Some(250.0));
        assert_eq!(k.city_coverage_count, 4);
    }

    #[test]
    fn test_kpis_empty_view() {
        let ds = sample();
        let k = kpis(&apply(&ds, &FilterCriteria::default().with_bathrooms(9)));
        assert_eq!(k.listing_count, 0);
        assert_eq!(k.average_price, None);
        assert_eq!(k.city_coverage_count, 0);
    }

    #[test]
    fn test_grouped_by_photo() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default());
        let stats = grouped_price_stats(&view, "photos").unwrap();
        assert_eq!(stats.total(), 4);
        let GroupedPriceStats::Grouped { axis, categories } = stats else {
            panic!("expected grouped stats");
        };
        assert_eq!(axis, GroupingAxis::PhotoPresence);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].label, "No");
        assert_eq!(categories[0].prices, vec![2000.0]);
        assert_eq!(categories[1].label, "Yes");
        assert_eq!(categories[1].prices, vec![1000.0, 1500.0, 3000.0]);
        assert_eq!(categories[1].summary.median, 1500.0);
        assert_eq!(categories[1].summary.q1, 1250.0);
        assert_eq!(categories[1].summary.q3, 2250.0);
    }

    #[test]
    fn test_grouped_unsupported_axis() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default());
        let stats = grouped_price_stats(&view, "bedrooms").unwrap();
        assert_eq!(
            stats,
            GroupedPriceStats::UnsupportedAxis {
                requested: "bedrooms".into()
            }
        );
    }

    #[test]
    fn test_grouped_decode_error_propagates() {
        let ds = dataset(&[[1000.0, 10.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]]);
        let view = apply(&ds, &FilterCriteria::default());
        let err = grouped_price_stats(&view, "photos").unwrap_err();
        assert_eq!(err.group, GroupKind::Photo);
        assert_eq!(err.row, 0);
    }

    #[test]
    fn test_correlation() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default());
        let result = amenity_price_correlation(&view, &[]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].amenity, "Pool");
        let r = result[0].correlation.value().unwrap();
        // Pool rows average 1500, others 2250.
        assert!(r < 0.0 && r > -1.0);
        // Gym is present everywhere: zero variance.
        assert_eq!(
            result[1].correlation,
            Correlation::Undefined(UndefinedReason::ConstantAmenity)
        );
    }

    #[test]
    fn test_correlation_too_few_rows() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default().with_amenity("Pool").with_square_feet(0.0, 0.0));
        let result = amenity_price_correlation(&view, &["Pool".to_string(), "Sauna".to_string()]);
        assert_eq!(result[0].correlation, Correlation::Undefined(UndefinedReason::TooFewRows));
        assert_eq!(
            result[1].correlation,
            Correlation::Undefined(UndefinedReason::UnknownAmenity)
        );
    }

    #[test]
    fn test_pearson_perfect() {
        assert_eq!(pearson(&[0.0, 1.0, 0.0, 1.0], &[1.0, 3.0, 1.0, 3.0]), Correlation::Defined(1.0));
        assert_eq!(
            pearson(&[0.0, 1.0], &[5.0, 5.0]),
            Correlation::Undefined(UndefinedReason::ConstantPrice)
        );
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_city_summary_orders_by_count() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default().with_amenity("Pool"));
        let summary = city_price_summary(&view);
        assert_eq!(summary.unresolved, 0);
        let cities = &summary.cities;
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].label, "Austin");
        assert_eq!(cities[0].listings, 1);
        assert_eq!(cities[1].column, "cityname_Denver");
        assert_eq!(cities[1].average_price, 2000.0);
    }

    #[test]
    fn test_city_summary_counts_listings_without_a_city() {
        // Second row is the dropped reference city: no cityname_* column set.
        let ds = dataset(&[
            [1000.0, 100.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
            [2000.0, 200.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        ]);
        let view = apply(&ds, &FilterCriteria::default());
        let summary = city_price_summary(&view);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.cities.len(), 1);
        assert_eq!(summary.cities[0].label, "Austin");
        assert_eq!(kpis(&view).city_coverage_count, 1);
    }

    #[test]
    fn test_pearson_constant_fractional_prices_are_undefined() {
        let flags = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let prices = [0.1; 10];
        assert_eq!(
            pearson(&flags, &prices),
            Correlation::Undefined(UndefinedReason::ConstantPrice)
        );
        assert_eq!(
            pearson(&[1.0; 3], &[1.0, 2.0, 3.0]),
            Correlation::Undefined(UndefinedReason::ConstantAmenity)
        );
    }

    #[test]
    fn test_amenity_average_prices() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default());
        let averages = amenity_average_prices(&view, &["Pool".to_string(), "Sauna".to_string()]);
        assert_eq!(averages[0].listings, 2);
        assert_eq!(averages[0].average_price, Some(1500.0));
        assert_eq!(averages[1].average_price, None);
    }

    #[test]
    fn test_price_points() {
        let ds = sample();
        let view = apply(&ds, &FilterCriteria::default().with_state("state_CA"));
        assert!(price_points(&view).is_empty());
        let all = price_points(&apply(&ds, &FilterCriteria::default()));
        assert_eq!(all[3].price, 3000.0);
        assert_eq!(all[3].latitude, 30.0);
    }
}
