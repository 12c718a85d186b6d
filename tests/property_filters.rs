use proptest::prelude::*;
use rent_scope::data::aggregate::{self, Correlation, UndefinedReason};
use rent_scope::data::filter::{self, FilterCriteria};
use rent_scope::data::model::{Cell, ColumnLayout, Dataset};
use rent_scope::data::onehot::GroupKind;

const HEADERS: &[&str] = &[
    "price",
    "bathrooms",
    "bedrooms",
    "square_feet",
    "description_length",
    "latitude",
    "longitude",
    "state_CA",
    "state_NY",
    "state_TX",
    "has_photo_No",
    "has_photo_Thumbnail",
    "has_photo_Yes",
    "Pool",
    "Parking",
];

/// State, bathrooms, size and one per amenity.
const MAX_PREDICATES: usize = 5;

#[derive(Debug, Clone)]
struct Row {
    price: u32,
    bathrooms: u32,
    square_feet: u32,
    state: usize,
    photo: usize,
    pool: bool,
    parking: bool,
}

fn row() -> impl Strategy<Value = Row> {
    (
        300u32..5_000,
        1u32..4,
        200u32..2_000,
        0usize..3,
        0usize..3,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(price, bathrooms, square_feet, state, photo, pool, parking)| Row {
            price,
            bathrooms,
            square_feet,
            state,
            photo,
            pool,
            parking,
        })
}

fn one_hot(len: usize, hot: usize) -> impl Iterator<Item = Cell> {
    (0..len).map(move |i| Cell::Integer(i64::from(i == hot)))
}

fn dataset(rows: &[Row]) -> Dataset {
    let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let table = rows
        .iter()
        .map(|r| {
            let mut cells = vec![
                Cell::Integer(i64::from(r.price)),
                Cell::Integer(i64::from(r.bathrooms)),
                Cell::Integer(1),
                Cell::Integer(i64::from(r.square_feet)),
                Cell::Integer(50),
                Cell::Float(0.0),
                Cell::Float(0.0),
            ];
            cells.extend(one_hot(3, r.state));
            cells.extend(one_hot(3, r.photo));
            cells.push(Cell::Bool(r.pool));
            cells.push(Cell::Bool(r.parking));
            cells
        })
        .collect();
    Dataset::from_table(&headers, table, &ColumnLayout::with_amenities(["Pool", "Parking"])).unwrap()
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::option::of(prop::sample::select(vec!["state_CA", "state_NY", "TX"])),
        prop::option::of(1u32..4),
        prop::option::of((200.0f64..2_000.0, 0.0f64..800.0)),
        prop::sample::subsequence(vec!["Pool", "Parking"], 0..=2),
    )
        .prop_map(|(state, bathrooms, range, amenities)| {
            let mut c = FilterCriteria::default();
            if let Some(s) = state {
                c = c.with_state(s);
            }
            if let Some(n) = bathrooms {
                c = c.with_bathrooms(n);
            }
            if let Some((lo, width)) = range {
                c = c.with_square_feet(lo, lo + width);
            }
            for a in amenities {
                c = c.with_amenity(a);
            }
            c
        })
}

proptest! {
    #[test]
    fn predicate_order_does_not_change_the_view(
        rows in prop::collection::vec(row(), 0..40),
        criteria in criteria(),
        order in Just((0..MAX_PREDICATES).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let ds = dataset(&rows);
        let predicates = filter::compile(&ds.schema, &criteria);
        prop_assert!(predicates.len() <= MAX_PREDICATES);
        let shuffled: Vec<_> = order
            .iter()
            .filter_map(|&i| predicates.get(i).copied())
            .collect();
        prop_assert_eq!(shuffled.len(), predicates.len());

        let in_order = filter::apply_predicates(&ds, &predicates);
        let permuted = filter::apply_predicates(&ds, &shuffled);
        prop_assert_eq!(in_order.indices(), permuted.indices());
        let applied = filter::apply(&ds, &criteria);
        prop_assert_eq!(in_order.indices(), applied.indices());
    }

    #[test]
    fn every_row_in_the_view_satisfies_every_criterion(
        rows in prop::collection::vec(row(), 0..40),
        criteria in criteria(),
    ) {
        let ds = dataset(&rows);
        let view = filter::apply(&ds, &criteria);
        let state_indicator = criteria.state.as_deref().map(|s| {
            ds.schema.group(GroupKind::State).and_then(|g| g.member(s)).unwrap().indicator
        });

        prop_assert!(view.indices().windows(2).all(|w| w[0] < w[1]));
        for listing in view.listings() {
            if let Some(indicator) = state_indicator {
                prop_assert!(listing.indicator(indicator));
            }
            if let Some(n) = criteria.bathrooms {
                prop_assert_eq!(listing.bathrooms, f64::from(n));
            }
            if let Some(range) = criteria.square_feet {
                prop_assert!(range.contains(listing.square_feet));
            }
            for amenity in &criteria.amenities {
                let idx = ds.schema.amenity_index(amenity).unwrap();
                prop_assert!(listing.has_amenity(idx));
            }
        }

        // Nothing that satisfies every criterion is left out.
        let kept = view.indices().len();
        let expected = ds
            .listings
            .iter()
            .filter(|l| {
                state_indicator.map_or(true, |i| l.indicator(i))
                    && criteria.bathrooms.map_or(true, |n| l.bathrooms == f64::from(n))
                    && criteria.square_feet.map_or(true, |r| r.contains(l.square_feet))
                    && criteria
                        .amenities
                        .iter()
                        .all(|a| ds.schema.amenity_index(a).is_some_and(|i| l.has_amenity(i)))
            })
            .count();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn empty_criteria_keep_every_row(rows in prop::collection::vec(row(), 0..40)) {
        let ds = dataset(&rows);
        let view = filter::apply(&ds, &FilterCriteria::default());
        let all_rows = (0..rows.len()).collect::<Vec<_>>();
        prop_assert_eq!(view.indices(), all_rows.as_slice());
    }

    #[test]
    fn grouped_counts_partition_the_view(
        rows in prop::collection::vec(row(), 0..40),
        criteria in criteria(),
    ) {
        let ds = dataset(&rows);
        let view = filter::apply(&ds, &criteria);
        let stats = aggregate::grouped_price_stats(&view, "photos").unwrap();
        prop_assert_eq!(stats.total(), aggregate::kpis(&view).listing_count);
    }

    #[test]
    fn correlation_is_undefined_below_two_rows(
        rows in prop::collection::vec(row(), 0..2),
    ) {
        let ds = dataset(&rows);
        let view = filter::apply(&ds, &FilterCriteria::default());
        for c in aggregate::amenity_price_correlation(&view, &[]) {
            prop_assert_eq!(c.correlation, Correlation::Undefined(UndefinedReason::TooFewRows));
        }
    }

    #[test]
    fn defined_correlations_stay_in_range(rows in prop::collection::vec(row(), 2..40)) {
        let ds = dataset(&rows);
        let view = filter::apply(&ds, &FilterCriteria::default());
        for c in aggregate::amenity_price_correlation(&view, &[]) {
            if let Some(r) = c.correlation.value() {
                prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r), "r = {}", r);
            }
        }
    }
}
