//! Record shapes
//!
//! A record arrives from the persistence API in one of three shapes:
//! - a flat field map (`{_id, Name, X, Y, ...}`)
//! - a GeoJSON feature (`{geometry, properties}`)
//! - a joined composite (`{data: [leftMatches[], rightMatches[]]}`)
//!
//! [`Record`] tags the shape once at decode time so downstream components
//! match on the variant instead of probing for members.
//!
//! Field names starting with [`RESERVED_PREFIX`] are internal (identifier,
//! metadata) and are never shown to users.

use geojson::Geometry;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::types::RecordId;

/// Field map of a record
pub type Properties = Map<String, JsonValue>;

/// Prefix marking reserved/internal fields
pub const RESERVED_PREFIX: char = '_';

/// Name of the record identifier field
pub const ID_FIELD: &str = "_id";

/// Whether a field name is reserved and hidden from users
pub fn is_reserved_field(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// A GeoJSON feature record.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// Feature geometry, rendered directly
    pub geometry: Geometry,
    /// Feature properties, the record's field map
    pub properties: Properties,
    /// Top-level members other than `geometry`/`properties`, kept as
    /// received (typically `_id` and `type`)
    pub extra: Properties,
}

/// A composite record assembled by relationship resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinedRecord {
    /// Matches from the relationship's first dataset
    pub left: Vec<Record>,
    /// Matches from the relationship's second dataset
    pub right: Vec<Record>,
}

impl JoinedRecord {
    /// All sub-records, left side first
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.left.iter().chain(self.right.iter())
    }
}

/// A record in one of the three wire shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Plain field map
    Flat(Properties),
    /// GeoJSON feature
    Geo(GeoFeature),
    /// Relationship join result
    Joined(JoinedRecord),
}

impl Record {
    /// Decode a record from JSON, detecting its shape.
    ///
    /// A `data` member holding an array of arrays marks a joined record; a
    /// non-null `geometry` member marks a GeoJSON feature; any other object
    /// is flat.
    pub fn from_json(value: JsonValue) -> Result<Record> {
        let mut obj = match value {
            JsonValue::Object(obj) => obj,
            other => {
                return Err(Error::InvalidRecord(format!(
                    "expected object, got {}",
                    json_type(&other)
                )))
            }
        };

        let is_joined = matches!(
            obj.get("data"),
            Some(JsonValue::Array(sides)) if !sides.is_empty() && sides.iter().all(JsonValue::is_array)
        );
        if is_joined {
            let mut sides = match obj.remove("data") {
                Some(JsonValue::Array(sides)) => sides.into_iter(),
                _ => Vec::new().into_iter(),
            };
            let left = decode_side(sides.next())?;
            let right = decode_side(sides.next())?;
            return Ok(Record::Joined(JoinedRecord { left, right }));
        }

        if obj.get("geometry").map(|g| !g.is_null()).unwrap_or(false) {
            let mut geometry = JsonValue::Null;
            let mut properties = Properties::new();
            let mut extra = Properties::new();
            for (key, value) in obj {
                match key.as_str() {
                    "geometry" => geometry = value,
                    "properties" => {
                        if let JsonValue::Object(p) = value {
                            properties = p;
                        }
                    }
                    _ => {
                        extra.insert(key, value);
                    }
                }
            }
            let geometry: Geometry = serde_json::from_value(geometry)
                .map_err(|e| Error::InvalidRecord(format!("bad geometry: {}", e)))?;
            return Ok(Record::Geo(GeoFeature {
                geometry,
                properties,
                extra,
            }));
        }

        Ok(Record::Flat(obj))
    }

    /// Encode back to the wire shape.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Record::Flat(props) => JsonValue::Object(props.clone()),
            Record::Geo(feature) => {
                let mut obj = feature.extra.clone();
                obj.insert(
                    "geometry".to_string(),
                    serde_json::to_value(&feature.geometry).unwrap_or(JsonValue::Null),
                );
                obj.insert(
                    "properties".to_string(),
                    JsonValue::Object(feature.properties.clone()),
                );
                JsonValue::Object(obj)
            }
            Record::Joined(joined) => {
                let side = |records: &[Record]| {
                    JsonValue::Array(records.iter().map(Record::to_json).collect())
                };
                let mut obj = Properties::new();
                obj.insert(
                    "data".to_string(),
                    JsonValue::Array(vec![side(&joined.left), side(&joined.right)]),
                );
                JsonValue::Object(obj)
            }
        }
    }

    /// The record's property bag: the field map for flat records, the
    /// `properties` for features, none for joined records.
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Record::Flat(props) => Some(props),
            Record::Geo(feature) => Some(&feature.properties),
            Record::Joined(_) => None,
        }
    }

    /// The `_id` of a flat or feature record.
    ///
    /// Features may carry the identifier at the top level or inside
    /// `properties`; the top level wins.
    pub fn id(&self) -> Option<RecordId> {
        let raw = match self {
            Record::Flat(props) => props.get(ID_FIELD),
            Record::Geo(feature) => feature
                .extra
                .get(ID_FIELD)
                .or_else(|| feature.properties.get(ID_FIELD)),
            Record::Joined(_) => None,
        };
        match raw? {
            JsonValue::String(s) => Some(RecordId::new(s.clone())),
            n @ JsonValue::Number(_) => Some(RecordId::new(crate::value::text(n))),
            _ => None,
        }
    }

    /// Look up a field, accepting dotted paths (`owner.name`) into nested
    /// objects when no field has the literal name.
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        let props = self.properties()?;
        if let Some(v) = props.get(field) {
            return Some(v);
        }
        let mut parts = field.split('.');
        let mut current = props.get(parts.next()?)?;
        for part in parts {
            current = match current {
                JsonValue::Object(obj) => obj.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Whether this is a joined composite
    pub fn is_joined(&self) -> bool {
        matches!(self, Record::Joined(_))
    }

    /// Visible `(field, value)` pairs: reserved fields removed, in
    /// first-seen order. Empty for joined records.
    pub fn visible_fields(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.properties()
            .into_iter()
            .flat_map(|props| props.iter())
            .filter(|(k, _)| !is_reserved_field(k))
    }
}

impl From<Properties> for Record {
    fn from(props: Properties) -> Self {
        Record::Flat(props)
    }
}

impl TryFrom<JsonValue> for Record {
    type Error = Error;

    fn try_from(value: JsonValue) -> Result<Self> {
        Record::from_json(value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Record::from_json(value).map_err(serde::de::Error::custom)
    }
}

fn decode_side(side: Option<JsonValue>) -> Result<Vec<Record>> {
    match side {
        Some(JsonValue::Array(items)) => items.into_iter().map(Record::from_json).collect(),
        _ => Ok(Vec::new()),
    }
}

fn json_type(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn polygon() -> JsonValue {
        json!({
            "type": "Polygon",
            "coordinates": [[[-63.6, 44.6], [-63.5, 44.6], [-63.5, 44.7], [-63.6, 44.6]]]
        })
    }

    #[test]
    fn test_flat_record_detected() {
        let r = Record::from_json(json!({"_id": 1, "Name": "Foo"})).unwrap();
        assert!(matches!(r, Record::Flat(_)));
        assert_eq!(r.id(), Some(RecordId::new("1")));
        assert_eq!(r.get("Name"), Some(&json!("Foo")));
    }

    #[test]
    fn test_geo_record_detected() {
        let r = Record::from_json(json!({
            "_id": "g1",
            "type": "Feature",
            "geometry": polygon(),
            "properties": {"Parish": "St. Paul"}
        }))
        .unwrap();
        match &r {
            Record::Geo(f) => {
                assert_eq!(f.properties.get("Parish"), Some(&json!("St. Paul")));
                assert!(f.extra.contains_key("_id"));
                assert_eq!(f.extra.get("type"), Some(&json!("Feature")));
            }
            other => panic!("expected Geo, got {:?}", other),
        }
        assert_eq!(r.id(), Some(RecordId::new("g1")));
    }

    #[test]
    fn test_feature_without_type_encodes_without_type() {
        let r = Record::from_json(json!({
            "geometry": {"type": "Point", "coordinates": [-63.5, 44.6]},
            "properties": {"Name": "x"}
        }))
        .unwrap();
        let encoded = r.to_json();
        assert!(encoded.get("type").is_none());
        assert_eq!(encoded["properties"], json!({"Name": "x"}));
    }

    #[test]
    fn test_null_geometry_is_flat() {
        let r = Record::from_json(json!({"geometry": null, "a": 1})).unwrap();
        assert!(matches!(r, Record::Flat(_)));
    }

    #[test]
    fn test_joined_record_detected() {
        let r = Record::from_json(json!({
            "data": [[{"_id": 1, "Name": "Foo"}], [{"_id": 2, "code": "A"}, {"_id": 3}]]
        }))
        .unwrap();
        match &r {
            Record::Joined(j) => {
                assert_eq!(j.left.len(), 1);
                assert_eq!(j.right.len(), 2);
                assert_eq!(j.iter().count(), 3);
            }
            other => panic!("expected Joined, got {:?}", other),
        }
        assert!(r.properties().is_none());
        assert!(r.id().is_none());
    }

    #[test]
    fn test_data_field_that_is_not_sides_stays_flat() {
        let r = Record::from_json(json!({"data": "raw", "x": 1})).unwrap();
        assert!(matches!(r, Record::Flat(_)));
        let r = Record::from_json(json!({"data": [1, 2]})).unwrap();
        assert!(matches!(r, Record::Flat(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            Record::from_json(json!([1, 2])),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_bad_geometry_rejected() {
        let err = Record::from_json(json!({"geometry": {"type": "Blob"}})).unwrap_err();
        assert!(err.to_string().contains("bad geometry"));
    }

    #[test]
    fn test_dotted_path_lookup() {
        let r = Record::from_json(json!({"owner": {"name": "Ada", "tags": ["x", "y"]}})).unwrap();
        assert_eq!(r.get("owner.name"), Some(&json!("Ada")));
        assert_eq!(r.get("owner.tags.1"), Some(&json!("y")));
        assert_eq!(r.get("owner.missing"), None);
    }

    #[test]
    fn test_visible_fields_skip_reserved() {
        let r = Record::from_json(json!({"_id": 1, "Name": "Foo", "_meta": {}, "City": "Halifax"}))
            .unwrap();
        let names: Vec<&str> = r.visible_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Name", "City"]);
    }

    #[test]
    fn test_serde_uses_wire_shape() {
        let wire = json!({"data": [[{"_id": 1}], []]});
        let r: Record = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&r).unwrap(), wire);
    }
}
