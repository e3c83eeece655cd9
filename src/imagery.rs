/*! Temporal selection of surface reflectance imagery. */

use crate::{
    engine::{Filter, Geometry, Image, ImageCollection, Session},
    error::CropSatResult,
};
use chrono::{Duration, NaiveDate};

/// The harmonized surface reflectance collection the indices are computed from.
pub const SURFACE_REFLECTANCE_ASSET: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Scene metadata property holding the percentage of cloudy pixels.
pub const CLOUD_COVER_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Scenes at or above this percentage of cloudy pixels are never considered.
pub const MAX_CLOUD_COVER: f64 = 10.0;

/// How many days on either side of the target date to search.
pub const SEARCH_RADIUS_DAYS: i64 = 3;

/// The closed search window around a target date.
pub fn search_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let radius = Duration::days(SEARCH_RADIUS_DAYS);
    (date - radius, date + radius)
}

/// Build, without evaluating, the expression for the least cloudy qualifying scene near a date.
pub fn least_cloudy_image(region: &Geometry, date: NaiveDate) -> Image {
    let (start, end) = search_window(date);

    ImageCollection::load(SURFACE_REFLECTANCE_ASSET)
        .filter_date(start, end)
        .filter_bounds(region)
        .filter(Filter::less_than(CLOUD_COVER_PROPERTY, MAX_CLOUD_COVER))
        .sort(CLOUD_COVER_PROPERTY)
        .first()
}

/// Find the least cloudy qualifying scene near a date.
///
/// Returns `Ok(None)` when no scene in the window clears the cloud cover ceiling, which is
/// routine and must not abort a scan.
pub fn find_least_cloudy_image(
    session: &mut Session,
    region: &Geometry,
    date: NaiveDate,
) -> CropSatResult<Option<Image>> {
    let image = least_cloudy_image(region, date);

    let info = session.compute(image.expr())?;
    if info.is_null() {
        let (start, end) = search_window(date);
        log::warn!(
            "no scene below {:.0}% cloud cover between {} and {}",
            MAX_CLOUD_COVER,
            start,
            end
        );
        return Ok(None);
    }

    Ok(Some(image))
}
