use chrono::NaiveDate;
use clap::Parser;
use cropsat::{
    append_csv, boundary_field_samples, dates, BoundaryRow, Credentials, CropSatResult,
    FeatureCollection, Session, FIELD_BOUNDARY_ASSET,
};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{error::Error, path::PathBuf};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Harvest daily vegetation index tables over published field boundary polygons.
///
/// For every date in the range this program selects the least cloudy scene near the date and
/// has the remote engine reduce the five spectral indices to a mean per field boundary
/// polygon, appending the resulting rows to a CSV file.
///
#[derive(Debug, Parser)]
#[clap(name = "fieldscan")]
#[clap(author, version, about)]
struct FieldScanOptions {
    /// The path to the stored engine credentials file.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "CROPSAT_CREDENTIALS" environment variable.
    #[clap(short, long)]
    #[clap(env = "CROPSAT_CREDENTIALS")]
    credentials: PathBuf,

    /// The cloud project engine requests are billed to.
    #[clap(short, long)]
    #[clap(env = "CROPSAT_PROJECT")]
    project: String,

    /// The CSV file to append rows to, created with a header row if absent.
    #[clap(short, long, default_value = "field_boundary_indices.csv")]
    output: PathBuf,

    /// The field boundary table asset to aggregate over.
    #[clap(long, default_value = FIELD_BOUNDARY_ASSET)]
    asset: String,

    /// The first date of the range in the format YYYY-MM-DD.
    #[clap(parse(try_from_str=parse_date))]
    #[clap(default_value = "2022-06-01")]
    start: NaiveDate,

    /// The last date of the range in the format YYYY-MM-DD.
    #[clap(parse(try_from_str=parse_date))]
    #[clap(default_value = "2022-08-31")]
    end: NaiveDate,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Parse a command line date.
fn parse_date(date_str: &str) -> CropSatResult<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?)
}

/*-------------------------------------------------------------------------------------------------
 *                                             Main
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let options = FieldScanOptions::parse();

    let module_level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("fieldscan", module_level)
        .with_module_level("cropsat", module_level)
        .init()?;

    log::trace!("Trace messages enabled.");
    log::debug!("Debug messages enabled.");
    log::info!("Info messages enabled.");
    log::warn!("Warn messages enabled.");
    log::error!("Error messages enabled.");

    if options.start > options.end {
        return Err(format!(
            "start date {} is after end date {}",
            options.start, options.end
        )
        .into());
    }

    let credentials = Credentials::from_file(&options.credentials)?;
    let mut session = Session::connect(credentials, &options.project)?;

    let fields = FeatureCollection::load(&options.asset);

    let mut num_rows = 0;
    let mut greenest: Option<BoundaryRow> = None;

    for date in dates::daily(options.start, options.end) {
        log::info!("Processing date: {}", date);

        let samples = match boundary_field_samples(&mut session, &fields, date) {
            Ok(Some(samples)) => samples,
            Ok(None) => continue,
            Err(err) => {
                log::error!("Error processing {}: {}", date, err);
                continue;
            }
        };

        if samples.is_empty() {
            log::debug!("No valid fields on {}", date);
            continue;
        }

        let rows: Vec<BoundaryRow> = samples
            .into_iter()
            .map(|sample| BoundaryRow::new(date, sample))
            .collect();

        for row in &rows {
            if greenest.as_ref().map(|g| g.ndvi < row.ndvi).unwrap_or(true) {
                greenest = Some(row.clone());
            }
        }

        append_csv(&options.output, &rows)?;
        num_rows += rows.len();
        log::info!(
            "Appended {} rows for {} to {}",
            rows.len(),
            date,
            options.output.display()
        );
    }

    if let Some(row) = greenest {
        log::info!("");
        log::info!("Greenest field appended to the table:");
        log::info!("        date - {:>12}", row.date.to_string());
        log::info!("    field id - {:>12}", row.field_id);
        log::info!("        NDVI - {:>12.3}", row.ndvi);
        log::info!("");
        log::info!(
            "{} rows appended to {}",
            num_rows,
            options.output.display()
        );
        log::info!("");
    } else {
        log::warn!("");
        log::warn!("No rows appended to the table!");
        log::warn!("");
    }

    Ok(())
}
