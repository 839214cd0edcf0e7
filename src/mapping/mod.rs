//! Template-driven field mapping.
//!
//! A [`FieldMapping`] assigns every header of a template schema a
//! [`FieldSource`]. Resolving the mapping against an asset yields one output
//! record with exactly the template's headers, in template order.
//!
//! # Example
//!
//! ```
//! use kmz_oxide::mapping::{ComputedAttribute, FieldMapping, FieldSource, FixedAttribute};
//! use kmz_oxide::tabular::{parse, TabularMode};
//!
//! let template = parse("POLE_ID;LAT;PROVIDER;NOTE", TabularMode::Compat);
//! let mut mapping = FieldMapping::for_schema(&template);
//! mapping.set("POLE_ID", FieldSource::Fixed(FixedAttribute::Name))?;
//! mapping.set("LAT", FieldSource::Computed(ComputedAttribute::Latitude))?;
//! mapping.set("PROVIDER", FieldSource::Literal("NEW".to_string()))?;
//! assert_eq!(mapping.mapped_count(), 3);
//! # Ok::<(), kmz_oxide::Error>(())
//! ```

mod rows;
mod source;

pub use rows::{asset_rows, subscriber_rows, OutputRow};
pub use source::{
    cluster_name, format_coordinate, ComputedAttribute, FieldSource, FixedAttribute, RowContext,
    PREVIEW_MISSING,
};

use crate::error::{Error, Result};
use crate::tabular::TabularDataset;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Header shortcuts offered for subscriber templates.
pub const SUBSCRIBER_SHORTCUTS: &[(&str, &str)] = &[
    ("HOMEPASS_ID", "name"),
    ("HOUSE_NUMBER", "name"),
    ("BUILDING_LATITUDE", "latitude"),
    ("BUILDING_LONGITUDE", "longitude"),
    ("FAT_CODE", "fat_code"),
    ("FDT_CODE", "fdt_code"),
];

/// Header shortcuts offered for pole templates.
pub const POLE_SHORTCUTS: &[(&str, &str)] = &[
    ("POLE_ID", "name"),
    ("Coordinate (Lat) NEW", "latitude"),
    ("Coordinate (Long) NEW", "longitude"),
];

/// Pole provider column and the constant it is filled with.
pub const POLE_PROVIDER_SHORTCUT: (&str, &str) = ("Pole Provider (New)", "NEW");

/// Per-header data sources for one template schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMapping {
    sources: IndexMap<String, FieldSource>,
}

impl FieldMapping {
    /// Mapping for a template with every column unset.
    pub fn for_schema(template: &TabularDataset) -> Self {
        Self::from_headers(template.headers())
    }

    /// Mapping for a header list with every column unset.
    pub fn from_headers(headers: &[String]) -> Self {
        Self {
            sources: headers
                .iter()
                .map(|h| (h.clone(), FieldSource::Unset))
                .collect(),
        }
    }

    /// Mapping for a template, taking sources from a header-keyed table.
    ///
    /// Every key must be a template header.
    pub fn from_sources(
        template: &TabularDataset,
        sources: &BTreeMap<String, FieldSource>,
    ) -> Result<Self> {
        let mut mapping = Self::for_schema(template);
        for (header, source) in sources {
            mapping.set(header, source.clone())?;
        }
        Ok(mapping)
    }

    /// Choose the source of one column.
    pub fn set(&mut self, header: &str, source: FieldSource) -> Result<()> {
        match self.sources.get_mut(header) {
            Some(slot) => {
                *slot = source;
                Ok(())
            },
            None => Err(Error::Schema(format!(
                "Template has no column named '{}'",
                header
            ))),
        }
    }

    /// Source of a column; unknown headers read as unset.
    pub fn get(&self, header: &str) -> &FieldSource {
        self.sources.get(header).unwrap_or(&FieldSource::Unset)
    }

    /// Headers, in template order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Header and source pairs, in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSource)> {
        self.sources.iter().map(|(h, s)| (h.as_str(), s))
    }

    /// Number of columns with a source.
    pub fn mapped_count(&self) -> usize {
        self.sources.values().filter(|s| s.is_set()).count()
    }

    /// Whether this mapping was built for exactly these headers.
    pub fn matches_schema(&self, template: &TabularDataset) -> bool {
        self.headers().eq(template.headers().iter().map(String::as_str))
    }

    /// Map the subscriber shortcut headers present in the template.
    /// Returns how many columns were set.
    pub fn apply_subscriber_shortcuts(&mut self) -> usize {
        self.apply_shortcuts(SUBSCRIBER_SHORTCUTS)
    }

    /// Map the pole shortcut headers present in the template, including the
    /// provider constant. Returns how many columns were set.
    pub fn apply_pole_shortcuts(&mut self) -> usize {
        let mut applied = self.apply_shortcuts(POLE_SHORTCUTS);
        let (header, value) = POLE_PROVIDER_SHORTCUT;
        if self.set(header, FieldSource::Literal(value.to_string())).is_ok() {
            applied += 1;
        }
        applied
    }

    fn apply_shortcuts(&mut self, shortcuts: &[(&str, &str)]) -> usize {
        let mut applied = 0;
        for (header, tag) in shortcuts {
            let Some(source) = FieldSource::from_tag(tag, None) else {
                continue;
            };
            if self.set(header, source).is_ok() {
                log::debug!("Shortcut mapped '{}' to {}", header, tag);
                applied += 1;
            }
        }
        applied
    }

    /// Whether some column uses this source.
    pub fn uses(&self, source: &FieldSource) -> bool {
        self.sources.values().any(|s| s == source)
    }

    /// Resolve every column for one row.
    pub fn resolve(&self, ctx: &RowContext<'_>) -> OutputRow {
        self.sources
            .iter()
            .map(|(header, source)| (header.clone(), source.resolve(ctx)))
            .collect()
    }
}

/// Header-keyed sources for both pipelines, as stored in a JSON mapping file.
///
/// ```json
/// {"subscriber": {"HOMEPASS_ID": "name", "FAT_CODE": {"computed": "assigned_region"}},
///  "pole": {"Pole Provider (New)": {"manual": "NEW"}}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    /// Sources for the subscriber template
    #[serde(default)]
    pub subscriber: BTreeMap<String, FieldSource>,
    /// Sources for the pole template
    #[serde(default)]
    pub pole: BTreeMap<String, FieldSource>,
}

impl MappingFile {
    /// Parse mapping JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a mapping file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
