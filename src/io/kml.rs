use crate::core::catalog::ElementCatalog;
use crate::types::{Category, ElementEntry, FlightResult, Geometry, Vertex};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const PHOTO_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/placemark_square.png";
/// aabbggrr
const PLAN_LINE_COLOR: &str = "cc15f8ff";
const PLAN_LINE_WIDTH: &str = "8";
const POLYGON_FILL_COLOR: &str = "330b07e8";
const THUMBNAIL_WIDTH: u32 = 200;

/// Name of the document entry inside a KMZ archive
pub const KMZ_DOCUMENT: &str = "doc.kml";

/// Folders emitted, in document order
const FOLDERS: [Category; 3] = [Category::FlightPlan, Category::Polygon, Category::Image];

/// Geo-markup export of the catalog geometries
pub struct KmlWriter<'a> {
    root: &'a Path,
}

type XmlWriter = Writer<Vec<u8>>;

impl<'a> KmlWriter<'a> {
    /// `root` resolves image paths for the embedded thumbnails
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Serialize the document: one folder per category, one placemark per element with a geometry
    pub fn to_bytes(&self, catalog: &ElementCatalog, document_name: &str) -> FlightResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(
            BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
        ))?;
        writer.write_event(Event::Start(BytesStart::new("Document")))?;
        text_element(&mut writer, "name", document_name)?;

        for category in FOLDERS {
            writer.write_event(Event::Start(BytesStart::new("Folder")))?;
            text_element(&mut writer, "name", category.as_str())?;
            for entry in catalog.by_category(category) {
                if let Some(geometry) = &entry.geometry {
                    self.placemark(&mut writer, entry, geometry)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new("Folder")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Document")))?;
        writer.write_event(Event::End(BytesEnd::new("kml")))?;
        Ok(writer.into_inner())
    }

    pub fn write_file<P: AsRef<Path>>(
        &self,
        path: P,
        catalog: &ElementCatalog,
        document_name: &str,
    ) -> FlightResult<()> {
        log::info!("Writing KML: {}", path.as_ref().display());
        std::fs::write(path.as_ref(), self.to_bytes(catalog, document_name)?)?;
        Ok(())
    }

    /// Zipped variant holding the document as `doc.kml`
    pub fn write_kmz<P: AsRef<Path>>(
        &self,
        path: P,
        catalog: &ElementCatalog,
        document_name: &str,
    ) -> FlightResult<()> {
        log::info!("Writing KMZ: {}", path.as_ref().display());
        let document = self.to_bytes(catalog, document_name)?;
        let mut archive = ZipWriter::new(std::fs::File::create(path.as_ref())?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        archive.start_file(KMZ_DOCUMENT, options)?;
        archive.write_all(&document)?;
        archive.finish()?;
        Ok(())
    }

    fn placemark(&self, writer: &mut XmlWriter, entry: &ElementEntry, geometry: &Geometry) -> FlightResult<()> {
        writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
        text_element(writer, "name", &entry.filename)?;
        if entry.category == Category::Image {
            let path = entry.path_in(self.root);
            let url = format!("file:///{}", path.display().to_string().trim_start_matches('/'));
            writer.write_event(Event::Start(BytesStart::new("description")))?;
            writer.write_event(Event::CData(BytesCData::new(format!(
                "<img src='{}' width='{}' />",
                url, THUMBNAIL_WIDTH
            ))))?;
            writer.write_event(Event::End(BytesEnd::new("description")))?;
        }
        style(writer, geometry)?;
        extended_data(writer, &attributes(entry))?;

        match geometry {
            Geometry::Point(p) => {
                writer.write_event(Event::Start(BytesStart::new("Point")))?;
                text_element(writer, "altitudeMode", "clampToGround")?;
                text_element(writer, "coordinates", &format!("{},{},{}", p.lon, p.lat, p.alt))?;
                writer.write_event(Event::End(BytesEnd::new("Point")))?;
            }
            Geometry::Path(points) => {
                let coordinates: Vec<String> = points
                    .iter()
                    .map(|p| format!("{},{},0", p.lon, p.lat))
                    .collect();
                writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
                writer.write_event(Event::Start(BytesStart::new("LineString")))?;
                text_element(writer, "coordinates", &coordinates.join(" "))?;
                writer.write_event(Event::End(BytesEnd::new("LineString")))?;
                writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
            }
            Geometry::Polygon(vertices) => {
                writer.write_event(Event::Start(BytesStart::new("Polygon")))?;
                writer.write_event(Event::Start(BytesStart::new("outerBoundaryIs")))?;
                writer.write_event(Event::Start(BytesStart::new("LinearRing")))?;
                text_element(writer, "coordinates", &closed_ring(vertices))?;
                writer.write_event(Event::End(BytesEnd::new("LinearRing")))?;
                writer.write_event(Event::End(BytesEnd::new("outerBoundaryIs")))?;
                writer.write_event(Event::End(BytesEnd::new("Polygon")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
        Ok(())
    }
}

fn style(writer: &mut XmlWriter, geometry: &Geometry) -> FlightResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Style")))?;
    match geometry {
        Geometry::Point(_) => {
            writer.write_event(Event::Start(BytesStart::new("IconStyle")))?;
            writer.write_event(Event::Start(BytesStart::new("Icon")))?;
            text_element(writer, "href", PHOTO_ICON)?;
            writer.write_event(Event::End(BytesEnd::new("Icon")))?;
            writer.write_event(Event::End(BytesEnd::new("IconStyle")))?;
            writer.write_event(Event::Start(BytesStart::new("LabelStyle")))?;
            text_element(writer, "scale", "0")?;
            writer.write_event(Event::End(BytesEnd::new("LabelStyle")))?;
        }
        Geometry::Path(_) => {
            writer.write_event(Event::Start(BytesStart::new("LineStyle")))?;
            text_element(writer, "color", PLAN_LINE_COLOR)?;
            text_element(writer, "width", PLAN_LINE_WIDTH)?;
            writer.write_event(Event::End(BytesEnd::new("LineStyle")))?;
        }
        Geometry::Polygon(_) => {
            writer.write_event(Event::Start(BytesStart::new("PolyStyle")))?;
            text_element(writer, "color", POLYGON_FILL_COLOR)?;
            text_element(writer, "fill", "1")?;
            text_element(writer, "outline", "0")?;
            writer.write_event(Event::End(BytesEnd::new("PolyStyle")))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> FlightResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn extended_data(writer: &mut XmlWriter, attributes: &[(&str, String)]) -> FlightResult<()> {
    writer.write_event(Event::Start(BytesStart::new("ExtendedData")))?;
    for (name, value) in attributes {
        writer.write_event(Event::Start(
            BytesStart::new("Data").with_attributes([("name", *name)]),
        ))?;
        text_element(writer, "value", value)?;
        writer.write_event(Event::End(BytesEnd::new("Data")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ExtendedData")))?;
    Ok(())
}

/// Attribute block of a placemark; images carry their capture and camera fields
fn attributes(entry: &ElementEntry) -> Vec<(&'static str, String)> {
    let mut attributes = vec![
        ("filename", entry.filename.clone()),
        ("subfolder", entry.subfolder.clone()),
        ("size", entry.size.to_string()),
    ];
    if entry.category != Category::Image {
        return attributes;
    }

    let text = |value: Option<String>| value.unwrap_or_default();
    let details = entry.image_details().cloned().unwrap_or_default();
    attributes.extend([
        ("date", text(entry.date().map(|d| d.format("%Y-%m-%d").to_string()))),
        ("time", text(entry.time().map(|t| t.format("%H:%M:%S").to_string()))),
        ("latitude", text(entry.latitude.map(|v| v.to_string()))),
        ("longitude", text(entry.longitude.map(|v| v.to_string()))),
        ("altitude", text(entry.altitude.map(|v| v.to_string()))),
        ("camera", text(details.camera)),
        ("exposure", text(details.exposure)),
        ("iso", text(details.iso.map(|v| v.to_string()))),
    ]);
    attributes
}

/// Coordinates of a ring with the first vertex repeated at the end
fn closed_ring(vertices: &[Vertex]) -> String {
    let mut ring: Vec<String> = vertices.iter().map(|v| format!("{},{},0", v.lon, v.lat)).collect();
    if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
        if first != last {
            ring.push(format!("{},{},0", first.lon, first.lat));
        }
    }
    ring.join(" ")
}
