//! Order loading, input validation and CSV output

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::grouping::Totals;

/// One parsed order shipment, as produced by the upstream email-parsing and
/// geocoding steps. Coordinates are absent until geocoding has filled them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub zip: String,
    pub city: String,
    pub country: String,
    pub card_value: f64,
    pub card_count: u32,
    pub shipping: f64,
    pub order_date: NaiveDate,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

impl ShipmentRecord {
    /// Coordinates as (lat, lng) degrees, if geocoding has run for this record.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Load parsed orders from a CSV file.
///
/// Expected header: `shipment_id,zip,city,country,card_value,card_count,
/// shipping,order_date,lng,lat`. Empty `lng`/`lat` fields are read as absent
/// coordinates. Non-finite values in any numeric field are rejected here so
/// they cannot leak into the sums downstream.
pub fn load_orders(path: &str) -> crate::Result<Vec<ShipmentRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("failed to open orders file '{path}'"))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ShipmentRecord =
            row.with_context(|| format!("failed to parse orders file '{path}'"))?;
        validate_record(&record)?;
        records.push(record);
    }

    Ok(records)
}

fn validate_record(record: &ShipmentRecord) -> crate::Result<()> {
    for (field, value) in [("card_value", record.card_value), ("shipping", record.shipping)] {
        if !value.is_finite() {
            anyhow::bail!(
                "order loading: shipment '{}' has non-finite {field}",
                record.shipment_id
            );
        }
    }

    for (field, value) in [("lng", record.lng), ("lat", record.lat)] {
        if let Some(value) = value {
            if !value.is_finite() {
                anyhow::bail!(
                    "order loading: shipment '{}' has non-finite {field}",
                    record.shipment_id
                );
            }
        }
    }

    Ok(())
}

/// Write one summary table as CSV with a header row.
///
/// Serde drives the header from the row struct's field names; the csv writer
/// quotes any field containing a comma (concatenated city lists rely on this).
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> crate::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output file '{}'", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the grand totals as a two-column `field,total` table, one row per
/// numeric field.
pub fn write_totals(path: &Path, totals: &Totals) -> crate::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output file '{}'", path.display()))?;

    writer.write_record(["field", "total"])?;
    writer.serialize(("card_value", totals.card_value))?;
    writer.serialize(("card_count", totals.card_count))?;
    writer.serialize(("shipping", totals.shipping))?;
    writer.serialize(("order_count", totals.order_count))?;
    writer.flush()?;

    Ok(())
}
