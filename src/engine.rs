/*!
 * Client for the remote geospatial analytics engine.
 *
 * All of the expensive work in this crate, image filtering, masking, zonal statistics and
 * vectorization, happens on a remote service. This module builds serializable expression
 * graphs describing that work, ships them to the engine over HTTPS, and decodes the replies.
 */

mod expr;
pub use expr::{Expr, FeatureCollection, Filter, Geometry, Image, ImageCollection, Reducer};

mod feature;
pub use feature::{Feature, FeatureSet};

mod session;
pub use session::{Credentials, Session, DEFAULT_API_URL};
