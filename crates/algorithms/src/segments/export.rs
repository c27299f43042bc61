//! Feature export
//!
//! Builds vector features for the segments, their outlets, or the terminal
//! basins, each carrying the segment id and any per-segment properties.

use super::polygonize::polygonize;
use super::Segments;
use burnflow_core::vector::{AttributeValue, Feature, FeatureCollection};
use burnflow_core::{Error, Result};
use geo::{Geometry, MultiPolygon, Point};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Kind of feature to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    /// Segment linestrings
    Segments,
    /// Outlet point of every segment
    SegmentOutlets,
    /// Outlet points of terminal segments
    Outlets,
    /// Terminal basin multipolygons
    Basins,
}

impl FeatureType {
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Segments => "segments",
            FeatureType::SegmentOutlets => "segment outlets",
            FeatureType::Outlets => "outlets",
            FeatureType::Basins => "basins",
        }
    }

    /// Whether only terminal segments produce a feature
    fn terminal_only(self) -> bool {
        matches!(self, FeatureType::Outlets | FeatureType::Basins)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "segments" => Ok(FeatureType::Segments),
            "segment outlets" => Ok(FeatureType::SegmentOutlets),
            "outlets" => Ok(FeatureType::Outlets),
            "basins" => Ok(FeatureType::Basins),
            _ => Err(Error::InvalidParameter {
                name: "feature type",
                value: s.to_string(),
                reason: "supported types are segments, segment outlets, outlets, basins".into(),
            }),
        }
    }
}

/// Per-segment property values, one per segment
#[derive(Debug, Clone, Copy)]
pub enum Property<'a> {
    Float(&'a [f64]),
    Int(&'a [i64]),
    Bool(&'a [bool]),
    Text(&'a [String]),
}

impl Property<'_> {
    fn len(&self) -> usize {
        match self {
            Property::Float(v) => v.len(),
            Property::Int(v) => v.len(),
            Property::Bool(v) => v.len(),
            Property::Text(v) => v.len(),
        }
    }

    fn value(&self, index: usize) -> AttributeValue {
        match self {
            Property::Float(v) => AttributeValue::Float(v[index]),
            Property::Int(v) => AttributeValue::Int(v[index]),
            Property::Bool(v) => AttributeValue::Bool(v[index]),
            Property::Text(v) => AttributeValue::String(v[index].clone()),
        }
    }
}

impl Segments {
    /// Export segments, outlets or basins as features.
    ///
    /// # Arguments
    /// * `kind` - Which features to build
    /// * `properties` - Named per-segment values. Outlet and basin features
    ///   take the value of their terminal segment.
    ///
    /// Basins are located (sequentially) if they are not cached yet.
    pub fn features(&mut self, kind: FeatureType, properties: &[(&str, Property<'_>)]) -> Result<FeatureCollection> {
        for (name, property) in properties {
            self.check_length(name, property.len())?;
        }

        let indices: Vec<usize> = (0..self.len())
            .filter(|&i| !kind.terminal_only() || self.child[i] < 0)
            .collect();

        let geometries: Vec<Geometry<f64>> = match kind {
            FeatureType::Segments => indices.iter().map(|&i| self.lines[i].clone().into()).collect(),
            FeatureType::SegmentOutlets | FeatureType::Outlets => indices
                .iter()
                .map(|&i| {
                    let (row, col) = self.outlet(i);
                    let (x, y) = self.transform().pixel_to_geo(col, row);
                    Point::new(x, y).into()
                })
                .collect(),
            FeatureType::Basins => {
                let mut polygons = polygonize(self.locate_basins(false)?);
                indices
                    .iter()
                    .map(|&i| {
                        let basin = polygons.remove(&self.ids[i]);
                        basin.unwrap_or_else(|| MultiPolygon::new(vec![])).into()
                    })
                    .collect()
            }
        };

        let mut collection = FeatureCollection::new(self.crs().cloned());
        for (&i, geometry) in indices.iter().zip(geometries) {
            let mut feature = Feature::new(self.ids[i], geometry);
            for (name, property) in properties {
                feature.set_property(*name, property.value(i));
            }
            collection.push(feature);
        }
        debug!(kind = %kind, features = collection.len(), "exported features");
        Ok(collection)
    }
}
