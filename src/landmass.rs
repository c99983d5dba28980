use crate::error::GenerateError;
use anyhow::{Context, Error};
use geo::{coord, BooleanOps, BoundingRect, Contains, Intersects, LineString, Polygon, Rect};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use types::MercatorBox;

/// Land polygons in geographic coordinates (`x` is longitude, `y` latitude, both in degrees).
#[derive(Clone, Debug, Default)]
pub struct Landmass {
    polygons: Vec<Polygon<f64>>,
}

impl Landmass {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        Self { polygons }
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read landmass file {}", path.display()))?;
        let landmass = Self::from_geojson_str(&contents)?;
        log::info!(
            "Loaded {} polygons to compare against from {}",
            landmass.polygons.len(),
            path.display()
        );
        Ok(landmass)
    }

    /// Accepts a Polygon/MultiPolygon Feature or a FeatureCollection made up only of those.
    pub fn from_geojson_str(s: &str) -> Result<Self, GenerateError> {
        let geojson: GeoJson =
            s.parse().map_err(|e| GenerateError::InputFormat(format!("{}", e)))?;

        let mut polygons = Vec::new();
        match geojson {
            GeoJson::Feature(feature) => append_polygons(feature.geometry.as_ref(), &mut polygons)?,
            GeoJson::FeatureCollection(collection) => {
                for feature in &collection.features {
                    append_polygons(feature.geometry.as_ref(), &mut polygons)?;
                }
            }
            GeoJson::Geometry(_) => {
                return Err(GenerateError::InputFormat(
                    "expected a Feature or FeatureCollection, found a bare Geometry".into(),
                ))
            }
        }
        Ok(Self { polygons })
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// The parts of all polygons that lie within `rect`.
    pub fn clip(&self, rect: &Rect<f64>) -> Landmass {
        let window = rect.to_polygon();
        let mut polygons = Vec::new();
        for polygon in &self.polygons {
            match polygon.bounding_rect() {
                Some(bounds) if rect.contains(&bounds) => polygons.push(polygon.clone()),
                Some(bounds) if bounds.intersects(rect) => {
                    polygons.extend(polygon.intersection(&window).0.into_iter());
                }
                _ => {}
            }
        }
        Landmass { polygons }
    }

    pub fn intersects(&self, rect: &Rect<f64>) -> bool {
        self.polygons.iter().any(|p| p.intersects(rect))
    }
}

/// Geographic rectangle spanned by a Mercator box.
pub fn geographic_rect(bounds: &MercatorBox) -> Rect<f64> {
    let (north, west, south, east) = bounds.lat_lng_bounds();
    Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
}

fn append_polygons(
    geometry: Option<&Geometry>,
    polygons: &mut Vec<Polygon<f64>>,
) -> Result<(), GenerateError> {
    let geometry = geometry
        .ok_or_else(|| GenerateError::InputFormat("feature without a geometry".into()))?;
    match &geometry.value {
        Value::Polygon(rings) => polygons.push(to_polygon(rings)?),
        Value::MultiPolygon(parts) => {
            for rings in parts {
                polygons.push(to_polygon(rings)?);
            }
        }
        other => {
            return Err(GenerateError::InputFormat(format!(
                "expected Polygon or MultiPolygon geometry, found {}",
                geometry_name(other)
            )))
        }
    }
    Ok(())
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, GenerateError> {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|position| match position[..] {
                [x, y, ..] => Ok(coord! { x: x, y: y }),
                _ => Err(GenerateError::InputFormat("position with fewer than 2 values".into())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(LineString::new)
    });
    let exterior = rings
        .next()
        .ok_or_else(|| GenerateError::InputFormat("polygon without an exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}
