/*!
 * The field statistics aggregation pipeline.
 *
 * For a region and a target date: select the least cloudy scene, stack the five spectral
 * indices, mask them to cropland, vectorize cropland pixels into field polygons, reduce each
 * polygon's pixels to a mean vector, and flatten the evaluated collection into rows. All of
 * the pixel work happens on the engine; this module only composes the expression and
 * tabulates the reply.
 */

use crate::{
    engine::{Feature, FeatureCollection, FeatureSet, Filter, Geometry, Image, ImageCollection, Reducer, Session},
    error::CropSatResult,
    imagery,
    indices::{self, SpectralIndex},
};
use chrono::{Datelike, NaiveDate};
use strum::IntoEnumIterator;

/// The cropland classification collection, one image per year.
pub const CROPLAND_ASSET: &str = "USDA/NASS/CDL";

/// Band of the cropland classification holding the crop class codes.
pub const CROPLAND_BAND: &str = "cropland";

/// Scale in meters for vectorizing the cropland classification into field polygons.
pub const VECTORIZE_SCALE_M: f64 = 300.0;

/// Scale in meters for reducing index pixels over vectorized county fields.
pub const COUNTY_REDUCE_SCALE_M: f64 = 30.0;

/// Scale in meters for reducing index pixels over published field boundaries.
pub const BOUNDARY_REDUCE_SCALE_M: f64 = 10.0;

/// Upper bound on the pixels any single reduction may touch.
pub const MAX_PIXELS: f64 = 1.0e12;

/// Most fields retained per county and date.
pub const SAMPLE_LIMIT: u32 = 200;

/// Name of the shuffle column used for sampling.
const SHUFFLE_COLUMN: &str = "random";

/** The mean value of every spectral index over one field polygon. */
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    /// Identifier the engine assigned to the field polygon, stable within one evaluation.
    pub field_id: String,
    pub ndvi: f64,
    pub evi: f64,
    pub gndvi: f64,
    pub ndwi: f64,
    pub savi: f64,
    /// The field polygon as compact GeoJSON.
    pub geometry: String,
}

/// Vegetation index means for a bounded random sample of the cropland fields of a county.
///
/// Returns `Ok(None)` when no qualifying scene exists near the date.
pub fn county_field_samples(
    session: &mut Session,
    county: &Geometry,
    date: NaiveDate,
) -> CropSatResult<Option<Vec<FieldSample>>> {
    let image = match imagery::find_least_cloudy_image(session, county, date)? {
        Some(image) => image,
        None => return Ok(None),
    };

    let cropland = cropland_for_year(county, date);
    let masked = indices::all_indices(&image).update_mask(&cropland.gt(0.0));

    // Shuffle the vectorized fields so identifiers are not spatially ordered.
    let fields = cropland
        .reduce_to_vectors(county, VECTORIZE_SCALE_M, MAX_PIXELS)
        .random_column(SHUFFLE_COLUMN)
        .sort(SHUFFLE_COLUMN);

    let stats = masked
        .reduce_regions(&fields, Reducer::mean(), COUNTY_REDUCE_SCALE_M, MAX_PIXELS)
        .filter(Filter::not_null(&[SpectralIndex::Ndvi.band_name()]))
        .random_column(SHUFFLE_COLUMN)
        .sort(SHUFFLE_COLUMN)
        .limit(SAMPLE_LIMIT);

    let reply = session.get_features(&stats)?;

    Ok(Some(flatten(&reply)))
}

/// Vegetation index means over every published field boundary polygon.
///
/// Returns `Ok(None)` when no qualifying scene exists near the date.
pub fn boundary_field_samples(
    session: &mut Session,
    fields: &FeatureCollection,
    date: NaiveDate,
) -> CropSatResult<Option<Vec<FieldSample>>> {
    let region = fields.geometry();

    let image = match imagery::find_least_cloudy_image(session, &region, date)? {
        Some(image) => image,
        None => return Ok(None),
    };

    let stats = indices::all_indices(&image)
        .reduce_regions(fields, Reducer::mean(), BOUNDARY_REDUCE_SCALE_M, MAX_PIXELS)
        .filter(Filter::not_null(&[SpectralIndex::Ndvi.band_name()]));

    let reply = session.get_features(&stats)?;

    Ok(Some(flatten(&reply)))
}

/// The cropland classification for the year of the date, clipped to the region.
fn cropland_for_year(region: &Geometry, date: NaiveDate) -> Image {
    // Jan 1 and Dec 31 exist in every year.
    let year_start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap();
    let year_end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap();

    ImageCollection::load(CROPLAND_ASSET)
        .filter_date(year_start, year_end)
        .first()
        .select(&[CROPLAND_BAND])
        .clip(region)
}

fn flatten(reply: &FeatureSet) -> Vec<FieldSample> {
    reply.features.iter().filter_map(sample_from_feature).collect()
}

/// Turn one evaluated feature into a sample row, or skip it when an index is missing.
fn sample_from_feature(feature: &Feature) -> Option<FieldSample> {
    let mut sample = FieldSample {
        field_id: feature.id.clone(),
        ndvi: 0.0,
        evi: 0.0,
        gndvi: 0.0,
        ndwi: 0.0,
        savi: 0.0,
        geometry: feature.geometry.to_string(),
    };

    for index in SpectralIndex::iter() {
        let value = match feature.number(index.band_name()) {
            Some(value) => value,
            None => {
                log::warn!(
                    "field {} is missing {}, skipping",
                    feature.id,
                    index.band_name()
                );
                return None;
            }
        };

        use SpectralIndex::*;
        match index {
            Ndvi => sample.ndvi = value,
            Evi => sample.evi = value,
            Gndvi => sample.gndvi = value,
            Ndwi => sample.ndwi = value,
            Savi => sample.savi = value,
        }
    }

    Some(sample)
}
