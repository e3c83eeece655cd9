/*!
 * Server side expression graphs.
 *
 * The engine evaluates a JSON tree of algorithm invocations. Every node is either a
 * `functionName`/`arguments` pair or a literal wrapped in `constantValue`. The typed wrappers
 * below (images, collections, filters, reducers, geometries) only exist on the client; they
 * all reduce to [Expr] nodes when a request is serialized.
 */

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// How dates are spelled in engine requests.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A node in a server side expression graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Expr(Value);

impl Expr {
    /// Wrap a literal so the engine treats it as a constant rather than an invocation.
    pub fn constant<V: Into<Value>>(value: V) -> Self {
        Expr(json!({ "constantValue": value.into() }))
    }

    /// Build an algorithm invocation node.
    fn invoke(function: &str, args: Vec<(&str, Value)>) -> Self {
        let mut arguments = Map::with_capacity(args.len());
        for (name, value) in args {
            arguments.insert(name.to_owned(), value);
        }

        Expr(json!({ "functionName": function, "arguments": Value::Object(arguments) }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

fn date_arg(date: NaiveDate) -> Value {
    Value::from(date.format(DATE_FORMAT).to_string())
}

/*-------------------------------------------------------------------------------------------------
 *                                          Geometry
 *-----------------------------------------------------------------------------------------------*/

/** A region of the Earth's surface, sent to the engine as GeoJSON. */
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(Expr);

impl Geometry {
    /// Wrap a GeoJSON geometry object, for example one pulled off an evaluated feature.
    pub fn from_geojson(geojson: Value) -> Self {
        Geometry(Expr::constant(geojson))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                          Filters
 *-----------------------------------------------------------------------------------------------*/

/** A predicate over collection elements, applied server side. */
#[derive(Debug, Clone, PartialEq)]
pub struct Filter(Expr);

impl Filter {
    /// Keep elements whose timestamp falls in the half open range `[start, end)`.
    pub fn date(start: NaiveDate, end: NaiveDate) -> Self {
        Filter(Expr::invoke(
            "Filter.date",
            vec![("start", date_arg(start)), ("end", date_arg(end))],
        ))
    }

    /// Keep elements whose named numeric property is strictly less than a value.
    pub fn less_than(name: &str, value: f64) -> Self {
        Filter(Expr::invoke(
            "Filter.lessThan",
            vec![("name", Value::from(name)), ("value", Value::from(value))],
        ))
    }

    /// Keep elements whose named property equals a string value.
    pub fn equals(name: &str, value: &str) -> Self {
        Filter(Expr::invoke(
            "Filter.equals",
            vec![("name", Value::from(name)), ("value", Value::from(value))],
        ))
    }

    /// Keep elements for which every named property evaluated to a value.
    pub fn not_null(properties: &[&str]) -> Self {
        Filter(Expr::invoke(
            "Filter.notNull",
            vec![("properties", Value::from(properties.to_vec()))],
        ))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                          Reducers
 *-----------------------------------------------------------------------------------------------*/

/** An aggregation the engine applies to the pixels falling in a region. */
#[derive(Debug, Clone, PartialEq)]
pub struct Reducer(Expr);

impl Reducer {
    /// The unweighted mean of the pixel values.
    pub fn mean() -> Self {
        Reducer(Expr::invoke("Reducer.mean", vec![]))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                           Images
 *-----------------------------------------------------------------------------------------------*/

/** A server side raster, possibly multi-band. */
#[derive(Debug, Clone, PartialEq)]
pub struct Image(Expr);

impl Image {
    /// Keep only the named bands.
    pub fn select(&self, bands: &[&str]) -> Image {
        Image(Expr::invoke(
            "Image.select",
            vec![
                ("image", self.0.clone().into_value()),
                ("bands", Value::from(bands.to_vec())),
            ],
        ))
    }

    /// Compute `(first - second) / (first + second)` per pixel.
    pub fn normalized_difference(&self, first: &str, second: &str) -> Image {
        Image(Expr::invoke(
            "Image.normalizedDifference",
            vec![
                ("image", self.0.clone().into_value()),
                ("bandNames", Value::from(vec![first, second])),
            ],
        ))
    }

    /// Rename the single band of this image.
    pub fn rename(&self, name: &str) -> Image {
        Image(Expr::invoke(
            "Image.rename",
            vec![
                ("image", self.0.clone().into_value()),
                ("names", Value::from(vec![name])),
            ],
        ))
    }

    /// Evaluate a band arithmetic formula, with the formula's variables bound to images.
    pub fn expression(formula: &str, bindings: &[(&str, Image)]) -> Image {
        let mut map = Map::with_capacity(bindings.len());
        for (name, image) in bindings {
            map.insert((*name).to_owned(), image.0.clone().into_value());
        }

        Image(Expr::invoke(
            "Image.expression",
            vec![
                ("expression", Value::from(formula)),
                ("map", Value::Object(map)),
            ],
        ))
    }

    /// Append the bands of another image to this one.
    pub fn add_bands(&self, other: &Image) -> Image {
        Image(Expr::invoke(
            "Image.addBands",
            vec![
                ("dstImg", self.0.clone().into_value()),
                ("srcImg", other.0.clone().into_value()),
            ],
        ))
    }

    /// Mask this image wherever the mask image is zero or itself masked.
    pub fn update_mask(&self, mask: &Image) -> Image {
        Image(Expr::invoke(
            "Image.updateMask",
            vec![
                ("image", self.0.clone().into_value()),
                ("mask", mask.0.clone().into_value()),
            ],
        ))
    }

    /// Clip this image to a region.
    pub fn clip(&self, region: &Geometry) -> Image {
        Image(Expr::invoke(
            "Image.clip",
            vec![
                ("image", self.0.clone().into_value()),
                ("geometry", region.expr().clone().into_value()),
            ],
        ))
    }

    /// Per pixel test, 1 where this image is strictly greater than the value and 0 elsewhere.
    pub fn gt(&self, value: f64) -> Image {
        Image(Expr::invoke(
            "Image.gt",
            vec![
                ("image", self.0.clone().into_value()),
                ("value", Value::from(value)),
            ],
        ))
    }

    /// Reduce this image's pixels over every feature of a collection, best effort.
    ///
    /// The reduction outputs land on each feature as properties named after the image bands.
    pub fn reduce_regions(
        &self,
        collection: &FeatureCollection,
        reducer: Reducer,
        scale_meters: f64,
        max_pixels: f64,
    ) -> FeatureCollection {
        FeatureCollection(Expr::invoke(
            "Image.reduceRegions",
            vec![
                ("image", self.0.clone().into_value()),
                ("collection", collection.0.clone().into_value()),
                ("reducer", reducer.expr().clone().into_value()),
                ("scale", Value::from(scale_meters)),
                ("maxPixels", Value::from(max_pixels)),
                ("bestEffort", Value::from(true)),
            ],
        ))
    }

    /// Vectorize the connected regions of a classified raster into polygons.
    pub fn reduce_to_vectors(
        &self,
        region: &Geometry,
        scale_meters: f64,
        max_pixels: f64,
    ) -> FeatureCollection {
        FeatureCollection(Expr::invoke(
            "Image.reduceToVectors",
            vec![
                ("image", self.0.clone().into_value()),
                ("geometry", region.expr().clone().into_value()),
                ("scale", Value::from(scale_meters)),
                ("geometryType", Value::from("polygon")),
                ("maxPixels", Value::from(max_pixels)),
            ],
        ))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                      Image Collections
 *-----------------------------------------------------------------------------------------------*/

/** A server side, time ordered stack of images identified by an asset ID. */
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCollection(Expr);

impl ImageCollection {
    /// Refer to a published image collection asset.
    pub fn load(asset_id: &str) -> Self {
        ImageCollection(Expr::invoke(
            "ImageCollection.load",
            vec![("id", Value::from(asset_id))],
        ))
    }

    /// Keep images acquired in the half open range `[start, end)`.
    pub fn filter_date(self, start: NaiveDate, end: NaiveDate) -> Self {
        ImageCollection(Expr::invoke(
            "ImageCollection.filterDate",
            vec![
                ("collection", self.0.into_value()),
                ("start", date_arg(start)),
                ("end", date_arg(end)),
            ],
        ))
    }

    /// Keep images whose footprint intersects a region.
    pub fn filter_bounds(self, region: &Geometry) -> Self {
        ImageCollection(Expr::invoke(
            "ImageCollection.filterBounds",
            vec![
                ("collection", self.0.into_value()),
                ("geometry", region.expr().clone().into_value()),
            ],
        ))
    }

    /// Apply a metadata filter.
    pub fn filter(self, filter: Filter) -> Self {
        ImageCollection(Expr::invoke(
            "Collection.filter",
            vec![
                ("collection", self.0.into_value()),
                ("filter", filter.expr().clone().into_value()),
            ],
        ))
    }

    /// Order the collection by a metadata property, ascending.
    pub fn sort(self, property: &str) -> Self {
        ImageCollection(Expr::invoke(
            "Collection.sort",
            vec![
                ("collection", self.0.into_value()),
                ("property", Value::from(property)),
                ("ascending", Value::from(true)),
            ],
        ))
    }

    /// The first image of the collection. Evaluates to null when the collection is empty.
    pub fn first(self) -> Image {
        Image(Expr::invoke(
            "Collection.first",
            vec![("collection", self.0.into_value())],
        ))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                     Feature Collections
 *-----------------------------------------------------------------------------------------------*/

/** A server side collection of vector features. */
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection(Expr);

impl FeatureCollection {
    /// Refer to a published table asset.
    pub fn load(asset_id: &str) -> Self {
        FeatureCollection(Expr::invoke(
            "FeatureCollection.load",
            vec![("id", Value::from(asset_id))],
        ))
    }

    /// Apply a metadata filter.
    pub fn filter(self, filter: Filter) -> Self {
        FeatureCollection(Expr::invoke(
            "Collection.filter",
            vec![
                ("collection", self.0.into_value()),
                ("filter", filter.expr().clone().into_value()),
            ],
        ))
    }

    /// The union of the geometries of all features in the collection.
    pub fn geometry(&self) -> Geometry {
        Geometry(Expr::invoke(
            "Collection.geometry",
            vec![("collection", self.0.clone().into_value())],
        ))
    }

    /// Add a column of deterministic pseudorandom numbers to every feature.
    pub fn random_column(self, column: &str) -> Self {
        FeatureCollection(Expr::invoke(
            "Collection.randomColumn",
            vec![
                ("collection", self.0.into_value()),
                ("columnName", Value::from(column)),
            ],
        ))
    }

    /// Order the collection by a property, ascending.
    pub fn sort(self, property: &str) -> Self {
        FeatureCollection(Expr::invoke(
            "Collection.sort",
            vec![
                ("collection", self.0.into_value()),
                ("property", Value::from(property)),
                ("ascending", Value::from(true)),
            ],
        ))
    }

    /// Keep at most the first `count` features.
    pub fn limit(self, count: u32) -> Self {
        FeatureCollection(Expr::invoke(
            "Collection.limit",
            vec![
                ("collection", self.0.into_value()),
                ("limit", Value::from(count)),
            ],
        ))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_wrapped() {
        let expr = Expr::constant(10.0);
        assert_eq!(expr.as_value(), &json!({ "constantValue": 10.0 }));
    }

    #[test]
    fn invocations_carry_function_name_and_arguments() {
        let reducer = Reducer::mean();
        assert_eq!(
            reducer.expr().as_value(),
            &json!({ "functionName": "Reducer.mean", "arguments": {} })
        );
    }

    #[test]
    fn filters_serialize_their_operands() {
        let filter = Filter::less_than("CLOUDY_PIXEL_PERCENTAGE", 10.0);
        assert_eq!(
            filter.expr().as_value(),
            &json!({
                "functionName": "Filter.lessThan",
                "arguments": { "name": "CLOUDY_PIXEL_PERCENTAGE", "value": 10.0 }
            })
        );

        let filter = Filter::not_null(&["NDVI"]);
        assert_eq!(
            filter.expr().as_value(),
            &json!({
                "functionName": "Filter.notNull",
                "arguments": { "properties": ["NDVI"] }
            })
        );
    }

    #[test]
    fn filter_dates_use_iso_format() {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 6, 7).unwrap();

        let filter = Filter::date(start, end);
        assert_eq!(
            filter.expr().as_value(),
            &json!({
                "functionName": "Filter.date",
                "arguments": { "start": "2022-06-01", "end": "2022-06-07" }
            })
        );
    }

    #[test]
    fn collection_chains_nest_inner_nodes() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();

        let image = ImageCollection::load("USDA/NASS/CDL")
            .filter_date(start, end)
            .first();

        let value = image.expr().as_value();
        assert_eq!(value["functionName"], "Collection.first");

        let inner = &value["arguments"]["collection"];
        assert_eq!(inner["functionName"], "ImageCollection.filterDate");
        assert_eq!(inner["arguments"]["start"], "2022-01-01");

        let load = &inner["arguments"]["collection"];
        assert_eq!(load["functionName"], "ImageCollection.load");
        assert_eq!(load["arguments"]["id"], "USDA/NASS/CDL");
    }

    #[test]
    fn normalized_difference_names_both_bands() {
        let image = ImageCollection::load("COPERNICUS/S2_SR_HARMONIZED").first();
        let nd = image.normalized_difference("B8", "B4");

        let value = nd.expr().as_value();
        assert_eq!(value["functionName"], "Image.normalizedDifference");
        assert_eq!(value["arguments"]["bandNames"], json!(["B8", "B4"]));
    }

    #[test]
    fn expression_binds_variables_to_images() {
        let image = ImageCollection::load("COPERNICUS/S2_SR_HARMONIZED").first();
        let bound = Image::expression(
            "(B8 - B4) / (B8 + B4)",
            &[("B8", image.select(&["B8"])), ("B4", image.select(&["B4"]))],
        );

        let value = bound.expr().as_value();
        assert_eq!(value["arguments"]["expression"], "(B8 - B4) / (B8 + B4)");
        assert_eq!(
            value["arguments"]["map"]["B8"]["functionName"],
            "Image.select"
        );
        assert_eq!(
            value["arguments"]["map"]["B4"]["arguments"]["bands"],
            json!(["B4"])
        );
    }

    #[test]
    fn reduce_regions_is_best_effort() {
        let image = ImageCollection::load("COPERNICUS/S2_SR_HARMONIZED").first();
        let fields = FeatureCollection::load("some/fields");

        let stats = image.reduce_regions(&fields, Reducer::mean(), 30.0, 1.0e12);
        let value = stats.expr().as_value();

        assert_eq!(value["functionName"], "Image.reduceRegions");
        assert_eq!(value["arguments"]["scale"], 30.0);
        assert_eq!(value["arguments"]["bestEffort"], true);
        assert_eq!(
            value["arguments"]["reducer"]["functionName"],
            "Reducer.mean"
        );
    }

    #[test]
    fn geometries_pass_geojson_through_unchanged() {
        let geojson = json!({ "type": "Point", "coordinates": [-93.6, 41.6] });
        let geometry = Geometry::from_geojson(geojson.clone());

        assert_eq!(
            geometry.expr().as_value(),
            &json!({ "constantValue": geojson })
        );
    }
}
