use crate::core::catalog::ElementCatalog;
use crate::core::geodesy::web_mercator;
use crate::io::raster::{default_raster_reader, stack_masked, RasterKind, RasterReader};
use crate::types::{Category, ElementEntry, FlightError, FlightResult, Geometry};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Stroke,
    StrokeDash, Transform,
};

/// Layers the compositor may draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayers {
    pub mosaic: bool,
    pub images: bool,
    pub polygon: bool,
    pub flight_plan: bool,
}

impl Default for MapLayers {
    fn default() -> Self {
        Self {
            mosaic: true,
            images: true,
            polygon: true,
            flight_plan: true,
        }
    }
}

/// Parameters for preview rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    /// Width and height of the square output in pixels
    pub size: u32,
    pub layers: MapLayers,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            size: 800,
            layers: MapLayers::default(),
        }
    }
}

const POLYGON_RGBA: [u8; 4] = [0xd4, 0x00, 0x00, 26];
const PLAN_RGBA: [u8; 4] = [0xd4, 0x00, 0x00, 102];
const PHOTO_PATH_RGBA: [u8; 4] = [0x55, 0x99, 0xff, 204];
const MARKER_RGBA: [u8; 4] = [0x55, 0x99, 0xff, 230];

/// Fraction of the frame left empty around the drawn geometries
const MARGIN: f64 = 0.05;
/// Extent (m) used when all geometries collapse onto one point
const MIN_SPAN: f64 = 100.0;

/// Renders a catalog into a square preview raster
pub struct MapCompositor {
    root: PathBuf,
    params: MapParams,
    reader: Box<dyn RasterReader>,
}

impl MapCompositor {
    pub fn new<P: AsRef<Path>>(root: P, params: MapParams) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            params,
            reader: default_raster_reader(),
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn RasterReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn params(&self) -> &MapParams {
        &self.params
    }

    /// Draw the preview. A mosaic, when enabled and readable, is the only layer;
    /// otherwise vector layers go back to front: polygons, flight plans, photo path, photo markers.
    pub fn render(&self, catalog: &ElementCatalog) -> FlightResult<Pixmap> {
        let size = self.params.size;
        let mut pixmap = Pixmap::new(size, size)
            .ok_or_else(|| FlightError::Render(format!("invalid map size {}", size)))?;
        pixmap.fill(Color::WHITE);

        if self.params.layers.mosaic {
            if let Some(raster) = select_mosaic(catalog) {
                match self.draw_mosaic(&mut pixmap, raster) {
                    Ok(()) => return Ok(pixmap),
                    Err(e) => log::warn!("Cannot draw mosaic {}, drawing vectors: {}", raster.filename, e),
                }
            }
        }

        self.draw_vectors(&mut pixmap, catalog);
        Ok(pixmap)
    }

    fn draw_mosaic(&self, pixmap: &mut Pixmap, raster: &ElementEntry) -> FlightResult<()> {
        log::info!("Rendering mosaic {}", raster.filename);
        let bands = self.reader.read_bands(&raster.path_in(&self.root))?;
        let cube = stack_masked(&bands)?;
        let channels: Vec<Array2<f32>> = if cube.len_of(Axis(0)) >= 3 {
            true_color((0..3).map(|i| cube.index_axis(Axis(0), i).to_owned()).collect())
        } else {
            // Greys colormap: high values dark
            vec![normalize(cube.index_axis(Axis(0), 0).to_owned()).mapv(|v| 1.0 - v)]
        };

        let (rows, cols) = channels[0].dim();
        if rows == 0 || cols == 0 {
            return Err(FlightError::Raster(format!("{} is empty", raster.filename)));
        }
        let size = pixmap.width() as usize;
        let scale = (size as f64 / cols as f64).min(size as f64 / rows as f64);
        let offset_x = (size as f64 - cols as f64 * scale) / 2.0;
        let offset_y = (size as f64 - rows as f64 * scale) / 2.0;

        let pixels = pixmap.pixels_mut();
        for y in 0..size {
            for x in 0..size {
                let col = ((x as f64 + 0.5 - offset_x) / scale).floor();
                let row = ((y as f64 + 0.5 - offset_y) / scale).floor();
                if col < 0.0 || row < 0.0 || col >= cols as f64 || row >= rows as f64 {
                    continue;
                }
                let (row, col) = (row as usize, col as usize);
                let value = |band: &Array2<f32>| band[[row, col]];
                let rgb = match channels.as_slice() {
                    [grey] => [value(grey); 3],
                    [r, g, b, ..] => [value(r), value(g), value(b)],
                    _ => continue,
                };
                if rgb.iter().any(|v| v.is_nan()) {
                    continue;
                }
                let [r, g, b] = rgb.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8);
                if let Some(color) = PremultipliedColorU8::from_rgba(r, g, b, 255) {
                    pixels[y * size + x] = color;
                }
            }
        }
        Ok(())
    }

    fn draw_vectors(&self, pixmap: &mut Pixmap, catalog: &ElementCatalog) {
        let layers = self.params.layers;
        let polygons: Vec<&Geometry> = if layers.polygon {
            geometries(catalog.by_category(Category::Polygon))
        } else {
            Vec::new()
        };
        let plans: Vec<&Geometry> = if layers.flight_plan {
            geometries(catalog.by_category(Category::FlightPlan))
        } else {
            Vec::new()
        };
        let photos: Vec<(f64, f64)> = if layers.images {
            catalog
                .oldest_first(Category::Image)
                .iter()
                .filter_map(|e| Some((e.longitude?, e.latitude?)))
                .collect()
        } else {
            Vec::new()
        };

        let mut extent: Vec<(f64, f64)> = polygons.iter().chain(&plans).flat_map(|g| g.lon_lat()).collect();
        extent.extend(&photos);
        let Some(frame) = Frame::fit(&extent, pixmap.width()) else {
            log::debug!("Nothing to draw on the map");
            return;
        };

        let size = pixmap.width() as f32;
        let identity = Transform::identity();

        for geometry in &polygons {
            if let Some(path) = frame.path(&geometry.lon_lat(), true) {
                pixmap.fill_path(&path, &paint(POLYGON_RGBA), FillRule::Winding, identity, None);
            }
        }

        let width = size / 72.0;
        let dashed = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            dash: StrokeDash::new(vec![width * 3.0, width * 2.0], 0.0),
            ..Default::default()
        };
        for geometry in &plans {
            if let Some(path) = frame.path(&geometry.lon_lat(), false) {
                pixmap.stroke_path(&path, &paint(PLAN_RGBA), &dashed, identity, None);
            }
        }

        let solid = Stroke {
            width: size * 0.6 / 72.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        if let Some(path) = frame.path(&photos, false) {
            pixmap.stroke_path(&path, &paint(PHOTO_PATH_RGBA), &solid, identity, None);
        }

        let radius = size * 0.011;
        let marker = paint(MARKER_RGBA);
        for &(lon, lat) in &photos {
            let (x, y) = frame.pixel(lon, lat);
            if let Some(circle) = PathBuilder::from_circle(x, y, radius) {
                pixmap.fill_path(&circle, &marker, FillRule::Winding, identity, None);
            }
        }
    }
}

/// Newest raster of the best available kind: orthophoto, other, DSM, DTM
fn select_mosaic(catalog: &ElementCatalog) -> Option<&ElementEntry> {
    let mut rasters = catalog.newest_first(Category::Raster);
    rasters.sort_by_key(|e| RasterKind::of(&e.filename));
    rasters.first().copied()
}

fn geometries(entries: Vec<&ElementEntry>) -> Vec<&Geometry> {
    entries.into_iter().filter_map(|e| e.geometry.as_ref()).collect()
}

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

/// Colour bands shown as stored when they already hold 0..1 or 8-bit
/// intensities, stretched per channel otherwise
fn true_color(bands: Vec<Array2<f32>>) -> Vec<Array2<f32>> {
    let (min, max) = bands
        .iter()
        .flat_map(|b| b.iter())
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min >= 0.0 && max <= 1.0 {
        bands
    } else if min >= 0.0 && max <= 255.0 {
        bands.into_iter().map(|b| b / 255.0).collect()
    } else {
        bands.into_iter().map(normalize).collect()
    }
}

/// Stretch finite values to 0..1; missing values stay NaN
fn normalize(band: Array2<f32>) -> Array2<f32> {
    let (min, max) = band
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return band.mapv(|_| f32::NAN);
    }
    let range = max - min;
    band.mapv(|v| {
        if !v.is_finite() {
            f32::NAN
        } else if range > 0.0 {
            (v - min) / range
        } else {
            0.5
        }
    })
}

/// Web Mercator window mapped onto the square output, north up
struct Frame {
    center: (f64, f64),
    scale: f64,
    half: f64,
}

impl Frame {
    fn fit(lon_lat: &[(f64, f64)], size: u32) -> Option<Self> {
        let projected: Vec<(f64, f64)> = lon_lat
            .iter()
            .filter(|(lon, lat)| lon.is_finite() && lat.is_finite())
            .map(|&(lon, lat)| web_mercator(lon, lat))
            .collect();
        let first = projected.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
        for &(x, y) in &projected {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let mut span = (max_x - min_x).max(max_y - min_y);
        if span <= 0.0 {
            span = MIN_SPAN;
        }
        let half = size as f64 / 2.0;
        Some(Self {
            center: ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            scale: size as f64 * (1.0 - 2.0 * MARGIN) / span,
            half,
        })
    }

    fn pixel(&self, lon: f64, lat: f64) -> (f32, f32) {
        let (x, y) = web_mercator(lon, lat);
        (
            (self.half + (x - self.center.0) * self.scale) as f32,
            (self.half - (y - self.center.1) * self.scale) as f32,
        )
    }

    fn path(&self, lon_lat: &[(f64, f64)], close: bool) -> Option<tiny_skia::Path> {
        let mut points = lon_lat.iter().map(|&(lon, lat)| self.pixel(lon, lat));
        let (x, y) = points.next()?;
        let mut builder = PathBuilder::new();
        builder.move_to(x, y);
        for (x, y) in points {
            builder.line_to(x, y);
        }
        if close {
            builder.close();
        }
        builder.finish()
    }
}
