use std::fmt;
use std::path::Path;

/// Coordinate reference system descriptor of a layer.
///
/// The descriptor is opaque text (a WKT string from a `.prj` sidecar or an
/// authority code such as `EPSG:4326`). Two descriptors are equal when they
/// match after whitespace and case normalisation. No reprojection is ever
/// performed here.
#[derive(Debug, Clone)]
pub enum Crs {
    Known(String),
    Unknown,
}

impl Crs {
    pub fn new(descriptor: &str) -> Crs {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            Crs::Unknown
        } else {
            Crs::Known(trimmed.to_string())
        }
    }

    pub fn epsg(code: u32) -> Crs {
        Crs::Known(format!("EPSG:{code}"))
    }

    /// Read the `.prj` sidecar next to a shapefile. A missing sidecar gives `Crs::Unknown`.
    pub fn from_sidecar<P: AsRef<Path>>(shp_path: P) -> std::io::Result<Crs> {
        let prj = shp_path.as_ref().with_extension("prj");
        if !prj.exists() {
            return Ok(Crs::Unknown);
        }
        let text = std::fs::read_to_string(prj)?;
        Ok(Crs::new(&text))
    }

    fn normalized(&self) -> Option<String> {
        match self {
            Crs::Known(s) => Some(
                s.chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_uppercase(),
            ),
            Crs::Unknown => None,
        }
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Crs {}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Known(s) => write!(f, "{s}"),
            Crs::Unknown => write!(f, "<unknown CRS>"),
        }
    }
}
