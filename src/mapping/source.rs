//! Column data sources and their per-row resolution.

use crate::assets::Asset;
use serde::{Deserialize, Serialize};

/// Value shown in previews when a source has nothing to show.
pub const PREVIEW_MISSING: &str = "N/A";

/// Attribute read directly from an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedAttribute {
    /// Geometry kind label (`point-feature`, `region-boundary`)
    Type,
    /// Raw placemark name
    Name,
}

/// Attribute derived from an asset or from run-level context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputedAttribute {
    /// Latitude of the asset position
    Latitude,
    /// Longitude of the asset position
    Longitude,
    /// Name prefix before the first `-`
    Cluster,
    /// Name of the boundary region the point was grouped under
    AssignedRegion,
    /// Name of the first distribution box in the document
    DistributionBoxName,
}

/// Where a column takes its value from.
///
/// Serialized externally tagged: `{"fixed": "name"}`,
/// `{"computed": "latitude"}`, `{"literal": "NEW"}`, `"unset"`.
/// Deserialization also accepts the tag vocabulary of [`FieldSource::from_tag`]
/// (`"name"`, `"fat_code"`, ...) and `{"manual": "NEW"}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "SourceInput")]
pub enum FieldSource {
    /// Asset attribute
    Fixed(FixedAttribute),
    /// Derived attribute
    Computed(ComputedAttribute),
    /// Same constant in every row
    Literal(String),
    /// Column left empty
    #[default]
    Unset,
}

impl FieldSource {
    /// Source for one of the tag names used by mapping forms: `name`, `type`,
    /// `cluster`, `latitude`, `longitude`, `fat_code`, `fdt_code`, `manual`
    /// (with its value) and the empty tag for unset.
    pub fn from_tag(tag: &str, manual_value: Option<&str>) -> Option<Self> {
        let source = match tag {
            "" => FieldSource::Unset,
            "name" => FieldSource::Fixed(FixedAttribute::Name),
            "type" => FieldSource::Fixed(FixedAttribute::Type),
            "cluster" => FieldSource::Computed(ComputedAttribute::Cluster),
            "latitude" => FieldSource::Computed(ComputedAttribute::Latitude),
            "longitude" => FieldSource::Computed(ComputedAttribute::Longitude),
            "fat_code" => FieldSource::Computed(ComputedAttribute::AssignedRegion),
            "fdt_code" => FieldSource::Computed(ComputedAttribute::DistributionBoxName),
            "manual" => FieldSource::Literal(manual_value.unwrap_or_default().to_string()),
            _ => return None,
        };
        Some(source)
    }

    /// Whether the column has a source.
    pub fn is_set(&self) -> bool {
        !matches!(self, FieldSource::Unset)
    }

    /// Value of this column for one row.
    pub fn resolve(&self, ctx: &RowContext<'_>) -> String {
        match self {
            FieldSource::Fixed(FixedAttribute::Type) => ctx.asset.kind().label().to_string(),
            FieldSource::Fixed(FixedAttribute::Name) => ctx.asset.name.clone(),
            FieldSource::Computed(ComputedAttribute::Latitude) => ctx
                .asset
                .position()
                .map(|c| format_coordinate(c.lat))
                .unwrap_or_default(),
            FieldSource::Computed(ComputedAttribute::Longitude) => ctx
                .asset
                .position()
                .map(|c| format_coordinate(c.lon))
                .unwrap_or_default(),
            FieldSource::Computed(ComputedAttribute::Cluster) => {
                cluster_name(&ctx.asset.name).to_string()
            },
            FieldSource::Computed(ComputedAttribute::AssignedRegion) => {
                ctx.region.unwrap_or_default().to_string()
            },
            FieldSource::Computed(ComputedAttribute::DistributionBoxName) => {
                ctx.distribution_box.to_string()
            },
            FieldSource::Literal(value) => value.clone(),
            FieldSource::Unset => String::new(),
        }
    }

    /// Preview text for a mapping form.
    ///
    /// Coordinates are shown with six decimals and empty values as `N/A`.
    /// Without a sample asset nothing can be previewed.
    pub fn preview(&self, ctx: Option<&RowContext<'_>>) -> String {
        let Some(ctx) = ctx else {
            return String::new();
        };

        let value = match self {
            FieldSource::Computed(ComputedAttribute::Latitude) => {
                ctx.asset.position().map(|c| format!("{:.6}", c.lat))
            },
            FieldSource::Computed(ComputedAttribute::Longitude) => {
                ctx.asset.position().map(|c| format!("{:.6}", c.lon))
            },
            FieldSource::Literal(value) => return value.clone(),
            FieldSource::Unset => return String::new(),
            _ => Some(self.resolve(ctx)),
        };

        value
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| PREVIEW_MISSING.to_string())
    }
}

/// Accepted input shapes for a source.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourceInput {
    Tagged(TaggedSource),
    Manual { manual: String },
    Tag(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedSource {
    Fixed(FixedAttribute),
    Computed(ComputedAttribute),
    Literal(String),
    Unset,
}

impl TryFrom<SourceInput> for FieldSource {
    type Error = String;

    fn try_from(input: SourceInput) -> std::result::Result<Self, Self::Error> {
        match input {
            SourceInput::Tagged(TaggedSource::Fixed(attr)) => Ok(FieldSource::Fixed(attr)),
            SourceInput::Tagged(TaggedSource::Computed(attr)) => Ok(FieldSource::Computed(attr)),
            SourceInput::Tagged(TaggedSource::Literal(value)) => Ok(FieldSource::Literal(value)),
            SourceInput::Tagged(TaggedSource::Unset) => Ok(FieldSource::Unset),
            SourceInput::Manual { manual } => Ok(FieldSource::Literal(manual)),
            SourceInput::Tag(tag) => FieldSource::from_tag(&tag, None)
                .ok_or_else(|| format!("unknown field source '{}'", tag)),
        }
    }
}

/// Everything a source may read for one output row.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// Asset the row describes
    pub asset: &'a Asset,
    /// Region the asset was grouped under, if any
    pub region: Option<&'a str>,
    /// Distribution-box label of the run
    pub distribution_box: &'a str,
}

/// Cluster prefix of an asset name: the text before the first `-`, or the
/// whole name when there is no dash or the prefix is empty.
pub fn cluster_name(name: &str) -> &str {
    match name.split('-').next() {
        Some(prefix) if !prefix.is_empty() => prefix,
        _ => name,
    }
}

/// Shortest decimal text that reads back as the same value.
///
/// Always plain decimal notation, never exponent form, and `0` is written as
/// `0` rather than left empty. Neither case occurs for real coordinates.
pub fn format_coordinate(value: f64) -> String {
    value.to_string()
}
