pub use engine::{
    Credentials, Expr, Feature, FeatureCollection, FeatureSet, Filter, Geometry, Image,
    ImageCollection, Reducer, Session, DEFAULT_API_URL,
};
pub use error::{AuthError, CropSatResult, EngineError};
pub use export::{append_csv, BoundaryRow, CountyRow};
pub use fields::{boundary_field_samples, county_field_samples, FieldSample, SAMPLE_LIMIT};
pub use imagery::{find_least_cloudy_image, MAX_CLOUD_COVER, SEARCH_RADIUS_DAYS};
pub use indices::{all_indices, SpectralIndex};
pub use regions::{counties_for_state, field_boundaries, County, FIELD_BOUNDARY_ASSET};

pub mod dates;

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod engine;
mod error;
mod export;
mod fields;
mod imagery;
mod indices;
mod regions;
