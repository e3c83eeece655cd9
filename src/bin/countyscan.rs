use chrono::NaiveDate;
use clap::Parser;
use cropsat::{
    append_csv, counties_for_state, county_field_samples, dates, CountyRow, Credentials,
    CropSatResult, Session,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    path::PathBuf,
    thread::{self, JoinHandle},
};

const CHANNEL_SIZE: usize = 100;

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Harvest weekly per-field vegetation index tables for every county of one or more states.
///
/// For each state, each week in the date range, and each county of the state, this program
/// selects the least cloudy scene near the target date, has the remote engine reduce the five
/// spectral indices over a random sample of vectorized cropland fields, and appends the
/// resulting rows to a CSV file.
///
#[derive(Debug, Parser)]
#[clap(name = "countyscan")]
#[clap(author, version, about)]
struct CountyScanOptions {
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
    #[clap(short, long, default_value = "county_field_indices.csv")]
    output: PathBuf,

    /// The states to process.
    #[clap(long, multiple_values = true, default_values = &["Iowa", "Illinois"])]
    states: Vec<String>,

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
    let options = CountyScanOptions::parse();

    let module_level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("countyscan", module_level)
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

    let output = options.output.clone();

    let (to_writer, from_scanner) = bounded(CHANNEL_SIZE);

    let scanner = start_scan_thread(&options, to_writer)?;
    let writer = start_writer_thread(output, from_scanner)?;

    scanner.join().unwrap();
    let (num_rows, greenest) = writer.join().unwrap();

    if let Some(row) = greenest {
        log::info!("");
        log::info!("Greenest field appended to the table:");
        log::info!("       state - {:>12}", row.state);
        log::info!("      county - {:>12}", row.county);
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

/*-------------------------------------------------------------------------------------------------
 *                                       Worker Threads
 *-----------------------------------------------------------------------------------------------*/
fn start_scan_thread(
    options: &CountyScanOptions,
    to_writer: Sender<Vec<CountyRow>>,
) -> Result<JoinHandle<()>, Box<dyn Error + Send + Sync>> {
    let credentials = Credentials::from_file(&options.credentials)?;
    let mut session = Session::connect(credentials, &options.project)?;

    let states = options.states.clone();
    let dates = dates::weekly(options.start, options.end);

    let jh = thread::Builder::new()
        .name("countyscan-fetch".to_owned())
        .spawn(move || {
            for state in &states {
                log::info!("Processing state: {}", state);

                let counties = match counties_for_state(&mut session, state) {
                    Ok(counties) => counties,
                    Err(err) => {
                        log::error!("Error listing counties for {}: {}", state, err);
                        continue;
                    }
                };
                log::debug!("{} has {} counties", state, counties.len());

                for &date in &dates {
                    for county in &counties {
                        log::info!("Processing {} on {}...", county.name, date);

                        let samples =
                            match county_field_samples(&mut session, &county.geometry, date) {
                                Ok(Some(samples)) => samples,
                                Ok(None) => {
                                    log::warn!("No scene for {} on {}", county.name, date);
                                    continue;
                                }
                                Err(err) => {
                                    log::error!(
                                        "Error processing {} on {}: {}",
                                        county.name,
                                        date,
                                        err
                                    );
                                    continue;
                                }
                            };

                        if samples.is_empty() {
                            log::debug!("No valid fields in {} on {}", county.name, date);
                            continue;
                        }

                        let rows: Vec<CountyRow> = samples
                            .into_iter()
                            .map(|sample| CountyRow::new(state, &county.name, date, sample))
                            .collect();

                        to_writer.send(rows).unwrap();
                    }
                }
            }
        })?;

    Ok(jh)
}

fn start_writer_thread(
    output: PathBuf,
    from_scanner: Receiver<Vec<CountyRow>>,
) -> Result<JoinHandle<(usize, Option<CountyRow>)>, Box<dyn Error + Send + Sync>> {
    let jh = thread::Builder::new()
        .name("countyscan-writer".to_owned())
        .spawn(move || {
            let mut num_rows = 0;
            let mut greenest: Option<CountyRow> = None;

            for rows in from_scanner {
                for row in &rows {
                    if greenest.as_ref().map(|g| g.ndvi < row.ndvi).unwrap_or(true) {
                        greenest = Some(row.clone());
                    }
                }

                let county = rows[0].county.clone();
                let date = rows[0].date;
                match append_csv(&output, &rows) {
                    Ok(()) => {
                        num_rows += rows.len();
                        log::info!(
                            "Appended {} rows for {} on {} to {}",
                            rows.len(),
                            county,
                            date,
                            output.display()
                        );
                    }
                    Err(err) => {
                        log::error!("Error appending to {}: {}", output.display(), err)
                    }
                }
            }

            (num_rows, greenest)
        })?;

    Ok(jh)
}
