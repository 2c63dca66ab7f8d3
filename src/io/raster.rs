use crate::types::{FlightError, FlightResult};
use ndarray::{Array2, Array3, Axis};
use std::path::Path;

/// One band of a raster file with its declared no-data sentinel
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub data: Array2<f32>,
    pub no_data: Option<f64>,
}

impl RasterBand {
    /// Band values with the no-data sentinel replaced by NaN
    pub fn masked(&self) -> Array2<f32> {
        match self.no_data {
            Some(sentinel) => {
                let sentinel = sentinel as f32;
                self.data.mapv(|v| if v == sentinel { f32::NAN } else { v })
            }
            None => self.data.clone(),
        }
    }
}

/// Stack masked bands into a (band, row, column) cube
pub fn stack_masked(bands: &[RasterBand]) -> FlightResult<Array3<f32>> {
    let first = bands
        .first()
        .ok_or_else(|| FlightError::Raster("raster has no bands".to_string()))?;
    let shape = first.data.dim();
    let mut cube = Array3::<f32>::zeros((bands.len(), shape.0, shape.1));
    for (i, band) in bands.iter().enumerate() {
        if band.data.dim() != shape {
            return Err(FlightError::Raster(format!(
                "band {} is {:?}, expected {:?}",
                i + 1,
                band.data.dim(),
                shape
            )));
        }
        cube.index_axis_mut(Axis(0), i).assign(&band.masked());
    }
    Ok(cube)
}

/// Raster role, taken from the file-name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RasterKind {
    Orthophoto,
    Other,
    Dsm,
    Dtm,
}

impl RasterKind {
    pub fn of(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        let stem = lower
            .strip_suffix(".tiff")
            .or_else(|| lower.strip_suffix(".tif"))
            .unwrap_or(&lower);
        if stem.ends_with("orthophoto") {
            RasterKind::Orthophoto
        } else if stem.ends_with("dsm") {
            RasterKind::Dsm
        } else if stem.ends_with("dtm") {
            RasterKind::Dtm
        } else {
            RasterKind::Other
        }
    }

    pub fn is_elevation(&self) -> bool {
        matches!(self, RasterKind::Dsm | RasterKind::Dtm)
    }
}

/// Source of raster band data
pub trait RasterReader {
    fn read_bands(&self, path: &Path) -> FlightResult<Vec<RasterBand>>;
}

/// GDAL-backed reader for GeoTIFF mosaics and elevation models
#[cfg(feature = "gdal")]
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalRasterReader;

#[cfg(feature = "gdal")]
impl RasterReader for GdalRasterReader {
    fn read_bands(&self, path: &Path) -> FlightResult<Vec<RasterBand>> {
        log::info!("Reading raster with GDAL: {}", path.display());
        let dataset = gdal::Dataset::open(path)?;
        let count = dataset.raster_count();
        log::debug!("Raster size: {:?}, {} band(s)", dataset.raster_size(), count);

        let mut bands = Vec::with_capacity(count.max(0) as usize);
        for i in 1..=count {
            let band = dataset.rasterband(i)?;
            let (width, height) = band.size();
            let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
            let data = Array2::from_shape_vec((height, width), buffer.data)
                .map_err(|e| FlightError::Raster(format!("Failed to reshape band {}: {}", i, e)))?;
            bands.push(RasterBand {
                data,
                no_data: band.no_data_value(),
            });
        }
        Ok(bands)
    }
}

/// Pure-Rust reader for TIFF/PNG rasters. Channels become bands; no sentinel is declared.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageRasterReader;

impl RasterReader for ImageRasterReader {
    fn read_bands(&self, path: &Path) -> FlightResult<Vec<RasterBand>> {
        log::info!("Reading raster: {}", path.display());
        let image = image::open(path)?;
        let channels: &[usize] = match image.color().channel_count() {
            1 => &[0],
            2 => &[0, 3],
            3 => &[0, 1, 2],
            _ => &[0, 1, 2, 3],
        };
        let rgba = image.to_rgba32f();
        let (width, height) = rgba.dimensions();

        Ok(channels
            .iter()
            .map(|&c| RasterBand {
                data: Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
                    rgba.get_pixel(col as u32, row as u32)[c]
                }),
                no_data: None,
            })
            .collect())
    }
}

/// GDAL when compiled in, the `image` decoder otherwise
pub fn default_raster_reader() -> Box<dyn RasterReader> {
    #[cfg(feature = "gdal")]
    {
        Box::new(GdalRasterReader)
    }
    #[cfg(not(feature = "gdal"))]
    {
        Box::new(ImageRasterReader)
    }
}
