/*! The spectral indices this crate asks the engine to compute. */

use crate::engine::Image;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Blue surface reflectance band.
pub const BLUE: &str = "B2";
/// Green surface reflectance band.
pub const GREEN: &str = "B3";
/// Red surface reflectance band.
pub const RED: &str = "B4";
/// Near infrared surface reflectance band.
pub const NIR: &str = "B8";
/// Shortwave infrared surface reflectance band.
pub const SWIR: &str = "B11";

/** The vegetation and moisture indices computed for every field. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum::Display)]
pub enum SpectralIndex {
    /// Normalized difference vegetation index.
    #[strum(serialize = "NDVI")]
    Ndvi,
    /// Enhanced vegetation index.
    #[strum(serialize = "EVI")]
    Evi,
    /// Green normalized difference vegetation index.
    #[strum(serialize = "GNDVI")]
    Gndvi,
    /// Normalized difference water index.
    #[strum(serialize = "NDWI")]
    Ndwi,
    /// Soil adjusted vegetation index.
    #[strum(serialize = "SAVI")]
    Savi,
}

impl SpectralIndex {
    /// The band name this index carries in images and in evaluated feature properties.
    pub fn band_name(self) -> &'static str {
        self.into()
    }

    /// Build the single band server side image for this index from a surface reflectance image.
    pub fn compute(self, image: &Image) -> Image {
        use SpectralIndex::*;

        let index = match self {
            Ndvi => image.normalized_difference(NIR, RED),
            Evi => Image::expression(
                "2.5 * ((B8 - B4) / (B8 + 6 * B4 - 7.5 * B2 + 1))",
                &[
                    (NIR, image.select(&[NIR])),
                    (RED, image.select(&[RED])),
                    (BLUE, image.select(&[BLUE])),
                ],
            ),
            Gndvi => image.normalized_difference(NIR, GREEN),
            Ndwi => image.normalized_difference(NIR, SWIR),
            Savi => Image::expression(
                "((B8 - B4) / (B8 + B4 + 0.5)) * 1.5",
                &[(NIR, image.select(&[NIR])), (RED, image.select(&[RED]))],
            ),
        };

        index.rename(self.band_name())
    }
}

/// Stack every index as a named band of a single image.
pub fn all_indices(image: &Image) -> Image {
    let mut stacked = SpectralIndex::Ndvi.compute(image);
    for index in SpectralIndex::iter().skip(1) {
        stacked = stacked.add_bands(&index.compute(image));
    }

    stacked
}
