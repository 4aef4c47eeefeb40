//! Aggregation of shipment records by country and by location

use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashMap;

use crate::data::ShipmentRecord;

/// Aggregate of all orders shipped to one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryAggregate {
    pub country: String,
    pub card_value: f64,
    pub card_count: u64,
    pub shipping: f64,
    pub order_count: u64,
}

/// Aggregate of all orders shipped to one exact coordinate pair.
///
/// `zip`, `city` and `country` are representative values picked from the
/// group's members according to a [`RepresentativePolicy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationAggregate {
    pub lng: f64,
    pub lat: f64,
    pub card_value: f64,
    pub card_count: u64,
    pub shipping: f64,
    pub order_count: u64,
    pub zip: String,
    pub city: String,
    pub country: String,
}

/// Grand totals across all country aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub card_value: f64,
    pub card_count: u64,
    pub shipping: f64,
    pub order_count: u64,
}

/// How to pick the representative zip/city/country for a coordinate group.
///
/// Geocoding granularity can place records with distinct city names on the
/// exact same coordinates, so the choice is configurable rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RepresentativePolicy {
    /// Take the values of the group's first record in input order
    #[default]
    FirstSeen,
    /// Take the most frequent value per field, first seen breaking ties
    MostFrequent,
}

/// Group records by country, summing the numeric fields and counting orders.
///
/// Output rows appear in first-seen key order, which makes repeated runs over
/// the same input deterministic. Callers must not rely on any other ordering.
pub fn groupby_country(records: &[ShipmentRecord]) -> Vec<CountryAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<CountryAggregate> = Vec::new();

    for record in records {
        let at = *index.entry(&record.country).or_insert_with(|| {
            rows.push(CountryAggregate {
                country: record.country.clone(),
                card_value: 0.0,
                card_count: 0,
                shipping: 0.0,
                order_count: 0,
            });
            rows.len() - 1
        });

        let row = &mut rows[at];
        row.card_value += record.card_value;
        row.card_count += u64::from(record.card_count);
        row.shipping += record.shipping;
        row.order_count += 1;
    }

    rows
}

/// Group records by exact (lng, lat) equality, summing the numeric fields.
///
/// Every record must already be geocoded; an absent coordinate aborts the run
/// rather than being imputed or silently dropped. Output rows appear in
/// first-seen key order.
pub fn groupby_location(
    records: &[ShipmentRecord],
    policy: RepresentativePolicy,
) -> crate::Result<Vec<LocationAggregate>> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut groups: Vec<((f64, f64), Vec<&ShipmentRecord>)> = Vec::new();

    for record in records {
        let (Some(lng), Some(lat)) = (record.lng, record.lat) else {
            anyhow::bail!(
                "location aggregation: shipment '{}' has no coordinates (geocoding incomplete)",
                record.shipment_id
            );
        };

        // Bit equality, matching the exactness of the grouping key
        let key = (lng.to_bits(), lat.to_bits());
        match index.get(&key) {
            Some(&at) => groups[at].1.push(record),
            None => {
                index.insert(key, groups.len());
                groups.push(((lng, lat), vec![record]));
            }
        }
    }

    let rows = groups
        .iter()
        .map(|((lng, lat), members)| {
            let mut row = LocationAggregate {
                lng: *lng,
                lat: *lat,
                card_value: 0.0,
                card_count: 0,
                shipping: 0.0,
                order_count: 0,
                zip: representative(members, policy, |r| r.zip.as_str()),
                city: representative(members, policy, |r| r.city.as_str()),
                country: representative(members, policy, |r| r.country.as_str()),
            };
            for record in members {
                row.card_value += record.card_value;
                row.card_count += u64::from(record.card_count);
                row.shipping += record.shipping;
                row.order_count += 1;
            }
            row
        })
        .collect();

    Ok(rows)
}

/// Pick one field's representative value for a coordinate group.
fn representative(
    members: &[&ShipmentRecord],
    policy: RepresentativePolicy,
    field: fn(&ShipmentRecord) -> &str,
) -> String {
    match policy {
        RepresentativePolicy::FirstSeen => field(members[0]).to_string(),
        RepresentativePolicy::MostFrequent => {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for record in members {
                *counts.entry(field(record)).or_insert(0) += 1;
            }
            // Scan in input order so ties resolve to the first-seen value
            let mut best: Option<(&str, u64)> = None;
            for record in members {
                let value = field(record);
                let count = counts[value];
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((value, count));
                }
            }
            best.map(|(value, _)| value).unwrap_or_default().to_string()
        }
    }
}

/// Sum the numeric fields across all country aggregates.
pub fn summarize(by_country: &[CountryAggregate]) -> Totals {
    let mut totals = Totals {
        card_value: 0.0,
        card_count: 0,
        shipping: 0.0,
        order_count: 0,
    };

    for row in by_country {
        totals.card_value += row.card_value;
        totals.card_count += row.card_count;
        totals.shipping += row.shipping;
        totals.order_count += row.order_count;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(
        shipment_id: &str,
        city: &str,
        country: &str,
        card_value: f64,
        card_count: u32,
        shipping: f64,
        lng: Option<f64>,
        lat: Option<f64>,
    ) -> ShipmentRecord {
        ShipmentRecord {
            shipment_id: shipment_id.to_string(),
            zip: format!("{city}-zip"),
            city: city.to_string(),
            country: country.to_string(),
            card_value,
            card_count,
            shipping,
            order_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            lng,
            lat,
        }
    }

    #[test]
    fn test_groupby_country_single_record() {
        let records = vec![record("S1", "Paris", "France", 10.0, 3, 2.0, Some(2.35), Some(48.86))];

        let rows = groupby_country(&records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].country, "France");
        assert_eq!(rows[0].card_value, 10.0);
        assert_eq!(rows[0].card_count, 3);
        assert_eq!(rows[0].shipping, 2.0);
        assert_eq!(rows[0].order_count, 1);
    }

    #[test]
    fn test_groupby_country_counts_all_orders() {
        let records = vec![
            record("S1", "Paris", "France", 10.0, 3, 2.0, Some(2.35), Some(48.86)),
            record("S2", "Lyon", "France", 5.0, 1, 1.0, Some(4.84), Some(45.76)),
            record("S3", "Berlin", "Germany", 8.0, 2, 3.0, Some(13.40), Some(52.52)),
        ];

        let rows = groupby_country(&records);

        assert_eq!(rows.len(), 2);
        let total_orders: u64 = rows.iter().map(|r| r.order_count).sum();
        assert_eq!(total_orders, records.len() as u64);

        let france = rows.iter().find(|r| r.country == "France").unwrap();
        assert_eq!(france.card_value, 15.0);
        assert_eq!(france.order_count, 2);
    }

    #[test]
    fn test_groupby_location_shared_coordinates() {
        let records = vec![
            record("S1", "Paris", "France", 10.0, 3, 2.0, Some(2.35), Some(48.86)),
            record("S2", "Paname", "France", 5.0, 1, 1.5, Some(2.35), Some(48.86)),
        ];

        let rows = groupby_location(&records, RepresentativePolicy::FirstSeen).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].card_value, 15.0);
        assert_eq!(rows[0].card_count, 4);
        assert_eq!(rows[0].shipping, 3.5);
        assert_eq!(rows[0].order_count, 2);
        // First-seen policy keeps the first record's descriptive fields
        assert_eq!(rows[0].city, "Paris");
        assert_eq!(rows[0].zip, "Paris-zip");
    }

    #[test]
    fn test_groupby_location_most_frequent_policy() {
        let records = vec![
            record("S1", "Paris", "France", 1.0, 1, 1.0, Some(2.35), Some(48.86)),
            record("S2", "Paname", "France", 1.0, 1, 1.0, Some(2.35), Some(48.86)),
            record("S3", "Paname", "France", 1.0, 1, 1.0, Some(2.35), Some(48.86)),
        ];

        let rows = groupby_location(&records, RepresentativePolicy::MostFrequent).unwrap();
        assert_eq!(rows[0].city, "Paname");

        // On a frequency tie the first-seen value wins
        let tied = &records[..2];
        let rows = groupby_location(tied, RepresentativePolicy::MostFrequent).unwrap();
        assert_eq!(rows[0].city, "Paris");
    }

    #[test]
    fn test_groupby_location_preserves_totals() {
        let records = vec![
            record("S1", "Paris", "France", 10.0, 3, 2.0, Some(2.35), Some(48.86)),
            record("S2", "Lyon", "France", 5.0, 1, 1.0, Some(4.84), Some(45.76)),
            record("S3", "Berlin", "Germany", 8.0, 2, 3.0, Some(13.40), Some(52.52)),
        ];

        let rows = groupby_location(&records, RepresentativePolicy::FirstSeen).unwrap();

        let input_value: f64 = records.iter().map(|r| r.card_value).sum();
        let output_value: f64 = rows.iter().map(|r| r.card_value).sum();
        assert_eq!(output_value, input_value);
    }

    #[test]
    fn test_groupby_location_rejects_absent_coordinates() {
        let records = vec![
            record("S1", "Paris", "France", 10.0, 3, 2.0, Some(2.35), Some(48.86)),
            record("S2", "Lyon", "France", 5.0, 1, 1.0, None, None),
        ];

        let err = groupby_location(&records, RepresentativePolicy::FirstSeen).unwrap_err();
        assert!(err.to_string().contains("shipment 'S2'"));
        assert!(err.to_string().contains("location aggregation"));
    }

    #[test]
    fn test_summarize() {
        let by_country = vec![
            CountryAggregate {
                country: "France".to_string(),
                card_value: 15.0,
                card_count: 4,
                shipping: 3.0,
                order_count: 2,
            },
            CountryAggregate {
                country: "Germany".to_string(),
                card_value: 8.0,
                card_count: 2,
                shipping: 3.0,
                order_count: 1,
            },
        ];

        let totals = summarize(&by_country);

        assert_eq!(totals.card_value, 23.0);
        assert_eq!(totals.card_count, 6);
        assert_eq!(totals.shipping, 6.0);
        assert_eq!(totals.order_count, 3);
    }
}
