//! CSV loader for rake transit sheets.
//!
//! Headers are normalized (trimmed, lowercased, spaces to `_`, dots removed)
//! before the required columns are looked up, so `Sr. No` reads as `sr_no`.

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::utility::round2;
use crate::config::IngestConfig;
use crate::record::TransitRecord;

const REQUIRED_COLUMNS: [&str; 9] = [
    "sr_no",
    "received_time",
    "dispatched_time",
    "transit_time",
    "sttn_from",
    "sttn_to",
    "cmdt",
    "totl_unts",
    "rake_type",
];

/// Cleaned records plus counts of the rows that did not survive cleaning.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub records: Vec<TransitRecord>,
    /// Rows with an unparseable timestamp or transit time.
    pub invalid: usize,
    /// Rows whose destination is not an accepted unit.
    pub foreign_destination: usize,
    pub duplicates: usize,
}

impl IngestOutcome {
    /// Drops repeated deliveries, keeping the first occurrence.
    fn dedup(&mut self) {
        let before = self.records.len();
        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.dedup_key()));
        self.duplicates += before - self.records.len();
    }
}

/// Column positions of the required fields in one sheet.
struct Columns([usize; REQUIRED_COLUMNS.len()]);

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = [0; REQUIRED_COLUMNS.len()];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = match normalized.iter().position(|h| h == name) {
                Some(pos) => pos,
                None => bail!("missing required column '{name}'"),
            };
        }
        Ok(Self(positions))
    }

    fn get<'r>(&self, row: &'r csv::StringRecord, name: &str) -> &'r str {
        REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == name)
            .and_then(|i| row.get(self.0[i]))
            .unwrap_or("")
            .trim()
    }
}

/// Normalizes a header cell, e.g. `" Totl. Unts "` becomes `totl_unts`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('.', "")
}

/// Converts an `H:MM` transit time into hours rounded to two decimals.
pub fn parse_transit_hours(value: &str) -> Option<f64> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: f64 = hours.trim().parse().ok()?;
    let minutes: f64 = minutes.trim().parse().ok()?;
    Some(round2(hours + minutes / 60.0))
}

/// Reads the unit count before any `+` suffix, e.g. `58+1` is 58.
pub fn parse_units(value: &str) -> Option<u32> {
    let head = value.split('+').next()?.trim();
    head.parse::<u32>()
        .ok()
        .or_else(|| head.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u32))
}

fn clean_row(
    row: &csv::StringRecord,
    cols: &Columns,
    config: &IngestConfig,
    outcome: &mut IngestOutcome,
) {
    let Some(destination) = config.destinations.get(cols.get(row, "sttn_to")) else {
        outcome.foreign_destination += 1;
        return;
    };

    let parse_ts = |name: &str| {
        NaiveDateTime::parse_from_str(cols.get(row, name), &config.timestamp_format).ok()
    };
    let (Some(received_at), Some(dispatched_at), Some(transit_hours)) = (
        parse_ts("received_time"),
        parse_ts("dispatched_time"),
        parse_transit_hours(cols.get(row, "transit_time")),
    ) else {
        outcome.invalid += 1;
        return;
    };

    let commodity = cols.get(row, "cmdt");
    let commodity = config
        .commodity_aliases
        .get(commodity)
        .map(String::as_str)
        .unwrap_or(commodity);

    outcome.records.push(TransitRecord {
        sr_no: cols.get(row, "sr_no").to_string(),
        received_at,
        dispatched_at,
        transit_hours,
        source: cols.get(row, "sttn_from").to_string(),
        destination: destination.clone(),
        commodity: commodity.to_string(),
        rake_type: cols.get(row, "rake_type").to_string(),
        units: parse_units(cols.get(row, "totl_unts")),
    });
}

fn read_into<R: Read>(reader: R, config: &IngestConfig, outcome: &mut IngestOutcome) -> Result<()> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let cols = Columns::locate(rdr.headers()?)?;

    for result in rdr.records() {
        let row = result?;
        clean_row(&row, &cols, config, outcome);
    }
    Ok(())
}

/// Parses and cleans one CSV sheet.
pub fn parse_records<R: Read>(reader: R, config: &IngestConfig) -> Result<IngestOutcome> {
    let mut outcome = IngestOutcome::default();
    read_into(reader, config, &mut outcome)?;
    outcome.dedup();
    Ok(outcome)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn is_sheet(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".csv") || name.ends_with(".csv.gz")
}

/// Opens `path` for reading, transparently decompressing `.gz` files.
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn sheet_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_sheet(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads a single sheet, or every `.csv` / `.csv.gz` sheet of a directory in
/// name order. Duplicates are dropped across all sheets.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_path(path: &Path, config: &IngestConfig) -> Result<IngestOutcome> {
    let paths = if path.is_dir() {
        sheet_paths(path)?
    } else {
        vec![path.to_path_buf()]
    };

    if paths.is_empty() {
        warn!("No CSV sheets found");
    }

    let mut outcome = IngestOutcome::default();
    for sheet in &paths {
        debug!(sheet = %sheet.display(), "Reading sheet");
        read_into(open_reader(sheet)?, config, &mut outcome)
            .with_context(|| format!("failed to parse '{}'", sheet.display()))?;
    }
    outcome.dedup();

    info!(
        sheets = paths.len(),
        records = outcome.records.len(),
        invalid = outcome.invalid,
        foreign_destination = outcome.foreign_destination,
        duplicates = outcome.duplicates,
        "Records loaded"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::io::Write;

    const SHEET: &str = "\
Sr. No,Received Time,Dispatched Time,Transit Time,Sttn From,Sttn To,Cmdt,Totl Unts,Rake Type
1,05-01-2026 10:30,04-01-2026 20:10,14:20,BJMT,HSPG,IOST,58+1,BOXN
2,06-01-2026 08:00,05-01-2026 09:00,23:00,KRBA,BSPC,COAL,59,BOXN
3,06-01-2026 08:00,05-01-2026 09:00,23:00,KRBA,BSPC,COAL,59,BOXN
4,07-01-2026 08:00,05-01-2026 09:00,47:00,KRBA,XXXX,COAL,59,BOXN
5,not a date,05-01-2026 09:00,23:00,KRBA,BSPC,COAL,59,BOXN
6,08-01-2026 08:00,07-01-2026 09:00,23,KRBA,BSPC,COAL,59,BOXN
";

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("{}_{name}", std::process::id()))
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Sr. No "), "sr_no");
        assert_eq!(normalize_header("Totl Unts"), "totl_unts");
        assert_eq!(normalize_header("STTN_TO"), "sttn_to");
    }

    #[test]
    fn test_parse_transit_hours() {
        assert_eq!(parse_transit_hours("14:20"), Some(14.33));
        assert_eq!(parse_transit_hours("0:45"), Some(0.75));
        assert_eq!(parse_transit_hours("23"), None);
        assert_eq!(parse_transit_hours("ab:10"), None);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("58+1"), Some(58));
        assert_eq!(parse_units("59"), Some(59));
        assert_eq!(parse_units("59.0"), Some(59));
        assert_eq!(parse_units("n/a"), None);
    }

    #[test]
    fn test_parse_records_cleans_sheet() {
        let outcome = parse_records(SHEET.as_bytes(), &IngestConfig::default()).unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.foreign_destination, 1);
        assert_eq!(outcome.invalid, 2);

        let first = &outcome.records[0];
        assert_eq!(first.destination, "RSP");
        assert_eq!(first.commodity, "IORE");
        assert_eq!(first.transit_hours, 14.33);
        assert_eq!(first.units, Some(58));
        assert_eq!(first.received_at.to_string(), "2026-01-05 10:30:00");
        assert_eq!(outcome.records[1].destination, "BSP");
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let sheet = "Sr. No,Received Time\n1,05-01-2026 10:30\n";
        let err = parse_records(sheet.as_bytes(), &IngestConfig::default()).unwrap_err();
        assert!(err.to_string().contains("dispatched_time"));
    }

    #[test]
    fn test_load_directory_with_gzip_sheet() {
        let dir = temp_path("rake_transit_test_sheets");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join("a.csv"), SHEET).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SHEET.as_bytes()).unwrap();
        fs::write(dir.join("b.csv.gz"), encoder.finish().unwrap()).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let outcome = load_path(&dir, &IngestConfig::default()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.duplicates, 4);

        fs::remove_dir_all(&dir).unwrap();
    }
}
