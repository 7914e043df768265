//! GeoJSON bounding-box filter.
//!
//! The box arrives as a GeoJSON `Polygon`; its exterior ring is reduced to
//! the enclosing latitude/longitude rectangle and rendered as a Solr
//! spatial range `field:[minLat,minLon TO maxLat,maxLon]`.

use serde_json::Value;

use crate::error::{Result, SearchError};

/// Latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Validate a GeoJSON polygon and take the rectangle enclosing its
    /// exterior ring. A JSON string holding the polygon is accepted too.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let parsed;
        let value = match value {
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s)
                    .map_err(|e| SearchError::invalid_geo(format!("not valid JSON: {e}")))?;
                &parsed
            }
            other => other,
        };

        let object = value
            .as_object()
            .ok_or_else(|| SearchError::invalid_geo("expected a GeoJSON object"))?;
        match object.get("type").and_then(Value::as_str) {
            Some("Polygon") => {}
            Some(other) => {
                return Err(SearchError::invalid_geo(format!(
                    "expected type 'Polygon', got '{other}'"
                )))
            }
            None => return Err(SearchError::invalid_geo("missing 'type'")),
        }

        let ring = object
            .get("coordinates")
            .and_then(Value::as_array)
            .and_then(|rings| rings.first())
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::invalid_geo("missing exterior ring"))?;
        if ring.len() < 4 {
            return Err(SearchError::invalid_geo(
                "exterior ring needs at least four positions",
            ));
        }

        let positions = ring
            .iter()
            .enumerate()
            .map(|(i, position)| parse_position(i, position))
            .collect::<Result<Vec<_>>>()?;
        if positions.first() != positions.last() {
            return Err(SearchError::invalid_geo("exterior ring is not closed"));
        }

        let mut bbox = BoundingBox {
            min_lat: f64::INFINITY,
            min_lon: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for (lon, lat) in positions {
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
        }
        Ok(bbox)
    }

    /// Solr spatial range over `field`.
    pub fn to_clause(&self, field: &str) -> String {
        format!(
            "{field}:[{},{} TO {},{}]",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// GeoJSON positions are `[longitude, latitude]`.
fn parse_position(index: usize, position: &Value) -> Result<(f64, f64)> {
    let coords = position
        .as_array()
        .filter(|c| c.len() >= 2)
        .ok_or_else(|| SearchError::invalid_geo(format!("position {index} is not [lon, lat]")))?;
    let (Some(lon), Some(lat)) = (coords[0].as_f64(), coords[1].as_f64()) else {
        return Err(SearchError::invalid_geo(format!(
            "position {index} has non-numeric coordinates"
        )));
    };
    if !(-180.0..=180.0).contains(&lon) {
        return Err(SearchError::invalid_geo(format!(
            "longitude {lon} at position {index} is out of range"
        )));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(SearchError::invalid_geo(format!(
            "latitude {lat} at position {index} is out of range"
        )));
    }
    Ok((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn polygon() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[13.0, 52.0], [14.5, 52.0], [14.5, 53.0], [13.0, 53.0], [13.0, 52.0]]]
        })
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::from_geojson(&polygon()).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                min_lat: 52.0,
                min_lon: 13.0,
                max_lat: 53.0,
                max_lon: 14.5,
            }
        );
        assert_eq!(
            bbox.to_clause("geo_location"),
            "geo_location:[52,13 TO 53,14.5]"
        );
    }

    #[test]
    fn test_string_encoded_polygon() {
        let encoded = Value::String(polygon().to_string());
        assert!(BoundingBox::from_geojson(&encoded).is_ok());
    }

    #[test]
    fn test_rejects_other_geometries() {
        let point = json!({"type": "Point", "coordinates": [13.0, 52.0]});
        assert!(matches!(
            BoundingBox::from_geojson(&point),
            Err(SearchError::InvalidGeoJsonFilter { .. })
        ));
    }

    #[test]
    fn test_rejects_open_ring() {
        let open = json!({
            "type": "Polygon",
            "coordinates": [[[13.0, 52.0], [14.0, 52.0], [14.0, 53.0], [13.0, 53.0]]]
        });
        let err = BoundingBox::from_geojson(&open).unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let bad = json!({
            "type": "Polygon",
            "coordinates": [[[13.0, 52.0], [14.0, 95.0], [14.0, 53.0], [13.0, 53.0], [13.0, 52.0]]]
        });
        let err = BoundingBox::from_geojson(&bad).unwrap_err();
        assert!(err.to_string().contains("latitude 95"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(BoundingBox::from_geojson(&Value::String("{not json".into())).is_err());
        assert!(BoundingBox::from_geojson(&json!([1, 2])).is_err());
        assert!(BoundingBox::from_geojson(&json!({"type": "Polygon"})).is_err());
    }
}
