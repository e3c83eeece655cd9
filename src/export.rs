/*!
 * Tabular export.
 *
 * Output files are plain CSV tables that grow across many runs. The header row is written
 * only when a file is created; every later write appends headerless rows, so re-running a
 * driver never corrupts an existing table.
 */

use crate::{error::CropSatResult, fields::FieldSample};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fs::OpenOptions, path::Path};

/** One output row of the county scan. */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRow {
    pub state: String,
    pub county: String,
    pub date: NaiveDate,
    pub field_id: String,
    pub ndvi: f64,
    pub evi: f64,
    pub gndvi: f64,
    pub ndwi: f64,
    pub savi: f64,
    pub geometry: String,
}

impl CountyRow {
    pub fn new(state: &str, county: &str, date: NaiveDate, sample: FieldSample) -> Self {
        CountyRow {
            state: state.to_owned(),
            county: county.to_owned(),
            date,
            field_id: sample.field_id,
            ndvi: sample.ndvi,
            evi: sample.evi,
            gndvi: sample.gndvi,
            ndwi: sample.ndwi,
            savi: sample.savi,
            geometry: sample.geometry,
        }
    }
}

/** One output row of the field boundary scan. */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRow {
    pub date: NaiveDate,
    pub field_id: String,
    pub ndvi: f64,
    pub evi: f64,
    pub gndvi: f64,
    pub ndwi: f64,
    pub savi: f64,
    pub geometry: String,
}

impl BoundaryRow {
    pub fn new(date: NaiveDate, sample: FieldSample) -> Self {
        BoundaryRow {
            date,
            field_id: sample.field_id,
            ndvi: sample.ndvi,
            evi: sample.evi,
            gndvi: sample.gndvi,
            ndwi: sample.ndwi,
            savi: sample.savi,
            geometry: sample.geometry,
        }
    }
}

/// Append rows to a CSV file, writing the header row only when creating the file.
pub fn append_csv<P: AsRef<Path>, R: Serialize>(path: P, rows: &[R]) -> CropSatResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let path = path.as_ref();
    let write_header = !path.exists();

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("cropsat_export_{}_{}", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn sample(id: &str, ndvi: f64) -> FieldSample {
        FieldSample {
            field_id: id.to_owned(),
            ndvi,
            evi: 0.2,
            gndvi: 0.3,
            ndwi: 0.4,
            savi: 0.5,
            geometry: r#"{"type":"Point","coordinates":[0.0,0.0]}"#.to_owned(),
        }
    }

    #[test]
    fn header_is_written_exactly_once() {
        let path = scratch_file("header_once.csv");
        let date = NaiveDate::from_ymd_opt(2022, 6, 5).unwrap();

        let first = vec![CountyRow::new("Iowa", "Story", date, sample("a", 0.7))];
        append_csv(&path, &first).unwrap();

        let second = vec![
            CountyRow::new("Iowa", "Polk", date, sample("b", 0.6)),
            CountyRow::new("Iowa", "Polk", date, sample("c", 0.5)),
        ];
        append_csv(&path, &second).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header_lines = text
            .lines()
            .filter(|line| line.starts_with("state,county,date,field_id"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(text.lines().count(), 4);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn appended_rows_read_back_in_order() {
        let path = scratch_file("read_back.csv");
        let date = NaiveDate::from_ymd_opt(2022, 6, 6).unwrap();

        append_csv(&path, &[BoundaryRow::new(date, sample("x", 0.81))]).unwrap();
        append_csv(&path, &[BoundaryRow::new(date, sample("y", 0.42))]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<BoundaryRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field_id, "x");
        assert_eq!(rows[0].date, date);
        assert_eq!(rows[1].ndvi, 0.42);

        std::fs::remove_file(&path).unwrap();
    }
}
