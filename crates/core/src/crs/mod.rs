//! Coordinate Reference System handling
//!
//! The core never reprojects. A CRS is an identifier carried through for
//! provenance, alignment checks and export.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WKT keywords that may open a CRS definition
const WKT_KEYWORDS: [&str; 9] = [
    "PROJCS", "GEOGCS", "GEOCCS", "COMPD_CS", "PROJCRS", "GEOGCRS", "GEODCRS", "COMPOUNDCRS",
    "BOUNDCRS",
];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse a CRS from `EPSG:<code>`, a WKT definition or a PROJ string
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Crs("empty CRS string".into()));
        }

        let upper = text.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("EPSG:") {
            return code
                .trim()
                .parse::<u32>()
                .map(Self::from_epsg)
                .map_err(|_| Error::Crs(format!("invalid EPSG code in \"{text}\"")));
        }

        if text.starts_with("+proj=") || text.contains(" +proj=") {
            return Ok(Self::from_proj(text));
        }

        let opens_wkt = WKT_KEYWORDS
            .iter()
            .any(|kw| upper.starts_with(kw) && upper[kw.len()..].trim_start().starts_with('['));
        if opens_wkt && text.ends_with(']') {
            return Ok(Self::from_wkt(text));
        }

        Err(Error::Crs(format!("could not interpret \"{text}\" as a CRS")))
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison is imperfect but deterministic
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a.split_whitespace().eq(b.split_whitespace());
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl FromStr for CRS {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::parse("epsg:26911").unwrap();
        assert_eq!(crs.epsg(), Some(26911));
        assert_eq!(crs.identifier(), "EPSG:26911");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::from_epsg(3857)));
    }

    #[test]
    fn test_crs_wkt_and_proj() {
        let wkt = CRS::parse(r#"PROJCS["NAD83 / UTM zone 11N",GEOGCS["NAD83"]]"#).unwrap();
        assert!(wkt.wkt().is_some());

        let proj: CRS = "+proj=utm +zone=11 +datum=NAD83".parse().unwrap();
        assert!(proj.is_equivalent(&CRS::from_proj("+proj=utm  +zone=11 +datum=NAD83")));
    }

    #[test]
    fn test_crs_unparseable() {
        assert!(matches!(CRS::parse("not a crs"), Err(Error::Crs(_))));
        assert!(matches!(CRS::parse("EPSG:abc"), Err(Error::Crs(_))));
        assert!(matches!(CRS::parse("   "), Err(Error::Crs(_))));
    }
}
