/*!
 * Region selection.
 *
 * Regions come from two places: published field boundary polygons referenced by a static
 * asset ID, and county polygons found by joining the census county dataset against the
 * census state dataset on the state's FIPS code.
 */

use crate::{
    engine::{FeatureCollection, Filter, Geometry, Session},
    error::CropSatResult,
};

/// Published field boundary polygons.
pub const FIELD_BOUNDARY_ASSET: &str = "projects/nass-csb/assets/csb1623/CSBAL1623";

/// Census county polygons.
pub const COUNTY_ASSET: &str = "TIGER/2018/Counties";

/// Census state polygons, used only to resolve a state name to its FIPS code.
pub const STATE_ASSET: &str = "TIGER/2018/States";

const STATE_FIPS_PROPERTY: &str = "STATEFP";
const NAME_PROPERTY: &str = "NAME";

/** A county polygon, ready to be sent back to the engine as a region. */
#[derive(Debug, Clone)]
pub struct County {
    pub name: String,
    pub geometry: Geometry,
}

/// The published field boundary dataset.
pub fn field_boundaries() -> FeatureCollection {
    FeatureCollection::load(FIELD_BOUNDARY_ASSET)
}

/// Look up every county belonging to a state, by state name.
///
/// An unknown state name is an error. A known state with no counties in the dataset yields
/// an empty list.
pub fn counties_for_state(session: &mut Session, state: &str) -> CropSatResult<Vec<County>> {
    let states = FeatureCollection::load(STATE_ASSET).filter(Filter::equals(NAME_PROPERTY, state));
    let reply = session.get_features(&states)?;

    let fips = reply
        .features
        .first()
        .and_then(|f| f.string(STATE_FIPS_PROPERTY))
        .ok_or_else(|| format!("no state named {} in {}", state, STATE_ASSET))?
        .to_owned();

    log::debug!("state {} has FIPS code {}", state, fips);

    let counties =
        FeatureCollection::load(COUNTY_ASSET).filter(Filter::equals(STATE_FIPS_PROPERTY, &fips));
    let reply = session.get_features(&counties)?;

    let mut found = Vec::with_capacity(reply.len());
    for feature in reply.features {
        let name = match feature.string(NAME_PROPERTY) {
            Some(name) => name.to_owned(),
            None => {
                log::warn!("county feature {} has no name, skipping", feature.id);
                continue;
            }
        };

        found.push(County {
            name,
            geometry: Geometry::from_geojson(feature.geometry),
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_boundaries_load_the_published_asset() {
        let value = field_boundaries().expr().as_value().clone();
        assert_eq!(value["functionName"], "FeatureCollection.load");
        assert_eq!(value["arguments"]["id"], FIELD_BOUNDARY_ASSET);
    }

    #[test]
    fn county_lookup_filters_on_the_fips_property() {
        let counties = FeatureCollection::load(COUNTY_ASSET)
            .filter(Filter::equals(STATE_FIPS_PROPERTY, "19"));

        let value = counties.expr().as_value().clone();
        assert_eq!(value["functionName"], "Collection.filter");

        let filter = &value["arguments"]["filter"];
        assert_eq!(filter["arguments"]["name"], STATE_FIPS_PROPERTY);
        assert_eq!(filter["arguments"]["value"], "19");
    }
}
