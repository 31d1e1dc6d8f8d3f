//! Per-collection field schemas and their registry.
//!
//! Every collection the repository serves is declared once as a
//! [`CollectionSchema`]: its name, primary key field and the fixed set of
//! fields a write must carry. The repository is generic over these
//! declarations instead of repeating CRUD logic per entity type.

use crate::document::{key_string, Document};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Collection name for cities.
pub const CITIES: &str = "cities";
/// Collection name for states.
pub const STATES: &str = "states";
/// Collection name for counties.
pub const COUNTIES: &str = "counties";
/// Collection name for countries.
pub const COUNTRIES: &str = "countries";

/// Type/format constraint on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Non-empty string.
    Text,
    /// Non-negative integer (populations).
    Count,
    /// Non-negative number (areas).
    Measure,
    /// Number in `[-90, 90]`.
    Latitude,
    /// Number in `[-180, 180]`.
    Longitude,
}

impl FieldKind {
    fn check(self, field: &str, value: &Value) -> Result<()> {
        let ok = match self {
            FieldKind::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            FieldKind::Count => value.as_u64().is_some(),
            FieldKind::Measure => value.as_f64().is_some_and(|n| n >= 0.0),
            FieldKind::Latitude => value.as_f64().is_some_and(|n| (-90.0..=90.0).contains(&n)),
            FieldKind::Longitude => value
                .as_f64()
                .is_some_and(|n| (-180.0..=180.0).contains(&n)),
        };

        if ok {
            Ok(())
        } else {
            Err(Error::ValidationError(format!(
                "field '{}' must be {}, got {}",
                field,
                self.describe(),
                value
            )))
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a non-empty string",
            FieldKind::Count => "a non-negative integer",
            FieldKind::Measure => "a non-negative number",
            FieldKind::Latitude => "a latitude between -90 and 90",
            FieldKind::Longitude => "a longitude between -180 and 180",
        }
    }
}

/// Declaration of one field in a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Field schema for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    collection: String,
    key_field: String,
    fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    /// Start a schema whose primary key is the required text field `key_field`.
    pub fn new(collection: impl Into<String>, key_field: impl Into<String>) -> Self {
        let key_field = key_field.into();
        CollectionSchema {
            collection: collection.into(),
            fields: vec![FieldSpec {
                name: key_field.clone(),
                kind: FieldKind::Text,
                required: true,
            }],
            key_field,
        }
    }

    /// Declare a field every write must carry.
    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name.into(), kind, true)
    }

    /// Declare a field that is checked only when present.
    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name.into(), kind, false)
    }

    fn field(mut self, name: String, kind: FieldKind, required: bool) -> Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => {
                existing.kind = kind;
                existing.required = required || name == self.key_field;
            }
            None => self.fields.push(FieldSpec {
                name,
                kind,
                required,
            }),
        }
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Names of the fields a write must carry.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Primary key carried by `doc`.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` if the key field is missing or unusable.
    pub fn key_of(&self, doc: &Document) -> Result<String> {
        match doc.get(&self.key_field) {
            None | Some(Value::Null) => Err(Error::ValidationError(format!(
                "missing required field '{}' for {}",
                self.key_field, self.collection
            ))),
            Some(value) => key_string(value).ok_or_else(|| {
                Error::ValidationError(format!(
                    "field '{}' is not a usable key: {}",
                    self.key_field, value
                ))
            }),
        }
    }

    /// Check `doc` against every declared field.
    ///
    /// `null` counts as absent. Fields not declared in the schema pass
    /// through unchecked.
    pub fn validate(&self, doc: &Document) -> Result<()> {
        for spec in &self.fields {
            match doc.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(Error::ValidationError(format!(
                        "missing required field '{}' for {}",
                        spec.name, self.collection
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) => spec.kind.check(&spec.name, value)?,
            }
        }
        Ok(())
    }

    /// Check only the fields present in `fields`, as for a partial update.
    ///
    /// Declared fields set to `null` are rejected when required; missing
    /// fields are not.
    pub fn validate_partial(&self, fields: &Document) -> Result<()> {
        for spec in &self.fields {
            match fields.get(&spec.name) {
                None => {}
                Some(Value::Null) if spec.required => {
                    return Err(Error::ValidationError(format!(
                        "required field '{}' cannot be null",
                        spec.name
                    )));
                }
                Some(Value::Null) => {}
                Some(value) => spec.kind.check(&spec.name, value)?,
            }
        }
        Ok(())
    }

    /// Built-in schema for [`CITIES`].
    pub fn cities() -> Self {
        CollectionSchema::new(CITIES, "name")
            .required("population", FieldKind::Count)
            .optional("state_code", FieldKind::Text)
            .optional("country_code", FieldKind::Text)
            .optional("latitude", FieldKind::Latitude)
            .optional("longitude", FieldKind::Longitude)
    }

    /// Built-in schema for [`STATES`].
    pub fn states() -> Self {
        CollectionSchema::new(STATES, "state_code")
            .required("name", FieldKind::Text)
            .required("population", FieldKind::Count)
            .optional("country_code", FieldKind::Text)
            .optional("capital", FieldKind::Text)
            .optional("area", FieldKind::Measure)
    }

    /// Built-in schema for [`COUNTIES`].
    pub fn counties() -> Self {
        CollectionSchema::new(COUNTIES, "name")
            .required("state_code", FieldKind::Text)
            .required("population", FieldKind::Count)
            .optional("county_seat", FieldKind::Text)
            .optional("area", FieldKind::Measure)
    }

    /// Built-in schema for [`COUNTRIES`].
    pub fn countries() -> Self {
        CollectionSchema::new(COUNTRIES, "code")
            .required("name", FieldKind::Text)
            .required("population", FieldKind::Count)
            .optional("capital", FieldKind::Text)
            .optional("area", FieldKind::Measure)
    }
}

/// Registry of the collections a repository serves.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, CollectionSchema>,
}

impl SchemaRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in city, state, county and country schemas.
    pub fn geographic() -> Self {
        let mut registry = Self::new();
        registry.register(CollectionSchema::cities());
        registry.register(CollectionSchema::states());
        registry.register(CollectionSchema::counties());
        registry.register(CollectionSchema::countries());
        registry
    }

    /// Register a schema, replacing any earlier one for the same collection.
    pub fn register(&mut self, schema: CollectionSchema) {
        self.schemas.insert(schema.collection.clone(), schema);
    }

    pub fn get(&self, collection: &str) -> Option<&CollectionSchema> {
        self.schemas.get(collection)
    }

    /// Look up a schema, failing for collections that were never registered.
    pub fn require(&self, collection: &str) -> Result<&CollectionSchema> {
        self.get(collection).ok_or_else(|| {
            Error::ValidationError(format!("unknown collection '{}'", collection))
        })
    }

    /// Registered collection names, sorted.
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
