/*!
 * Client side form of evaluated feature collections.
 *
 * When a [FeatureCollection](crate::FeatureCollection) expression is evaluated, the engine
 * replies with a GeoJSON shaped document. Only the parts of it this crate consumes are decoded.
 */

use serde::Deserialize;
use serde_json::{Map, Value};

/** One feature out of an evaluated collection. */
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// The identifier the engine assigned within this evaluation.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// The feature geometry, left as raw GeoJSON.
    #[serde(default)]
    pub geometry: Value,
}

impl Feature {
    /// Get a numeric property, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(Value::as_f64)
    }

    /// Get a string property, if present and a string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/** The decoded reply to evaluating a feature collection. */
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureSet {
    /// Decode an evaluated collection. A null reply decodes to an empty set.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(FeatureSet::default());
        }

        serde_json::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_geojson_shaped_reply() {
        let reply = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "00000000000000000042",
                    "properties": { "NDVI": 0.71, "NAME": "Story" },
                    "geometry": { "type": "Point", "coordinates": [-93.6, 42.0] }
                },
                {
                    "type": "Feature",
                    "properties": {}
                }
            ]
        });

        let set = FeatureSet::from_value(reply).unwrap();
        assert_eq!(set.len(), 2);

        let first = &set.features[0];
        assert_eq!(first.id, "00000000000000000042");
        assert_eq!(first.number("NDVI"), Some(0.71));
        assert_eq!(first.string("NAME"), Some("Story"));
        assert_eq!(first.number("EVI"), None);
        assert_eq!(first.string("NDVI"), None);

        let second = &set.features[1];
        assert!(second.id.is_empty());
        assert!(second.geometry.is_null());
    }

    #[test]
    fn null_reply_is_an_empty_set() {
        let set = FeatureSet::from_value(Value::Null).unwrap();
        assert!(set.is_empty());
    }
}
