//! Network asset extraction.
//!
//! A fiber-distribution KML groups its features in a fixed folder taxonomy
//! below one network root folder:
//!
//! ```text
//! DISTRIBUSI
//! ├── HP
//! │   ├── HOME
//! │   └── HOME-BIZ
//! ├── POLE, FDT, FAT, HOOK, QSPAN, SLINGEWIRE
//! ├── CABLE DISTRIBUTION, CABLE DROP
//! └── BOUNDARY FAT          (polygons)
//! ```
//!
//! [`AssetParser`] walks that taxonomy and produces an [`AssetCollection`].
//! Folders outside the allow-list are ignored. Placemarks without a usable
//! geometry are still recorded, with empty coordinates.

use crate::error::Result;
use crate::geometry::{parse_point, parse_ring, Coordinate, Ring};
use crate::markup::{MarkupTree, NodeId};
use std::fmt;

/// Default name of the network root folder.
pub const DEFAULT_NETWORK_ROOT: &str = "DISTRIBUSI";

/// Folder holding the two subscriber sub-folders.
const SUBSCRIBER_FOLDER: &str = "HP";

const POINT_PATH: &[&str] = &["Point", "coordinates"];
const RING_PATH: &[&str] = &["Polygon", "LinearRing", "coordinates"];

/// Geometry kind of an extracted feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Single-point placemark
    PointFeature,
    /// Polygon outer ring
    RegionBoundary,
}

impl AssetKind {
    /// Label written to output for the `type` attribute.
    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::PointFeature => "point-feature",
            AssetKind::RegionBoundary => "region-boundary",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracted geometry of one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Point position, `None` when the placemark had no parseable point
    Point(Option<Coordinate>),
    /// Ring vertices; may be empty or degenerate
    Ring(Vec<Coordinate>),
}

/// One extracted feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Placemark name (may be empty)
    pub name: String,
    /// Extracted geometry
    pub geometry: Geometry,
}

impl Asset {
    /// Create a point asset.
    pub fn point(name: impl Into<String>, position: Option<Coordinate>) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::Point(position),
        }
    }

    /// Create a region-boundary asset.
    pub fn region(name: impl Into<String>, ring: Vec<Coordinate>) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::Ring(ring),
        }
    }

    /// Geometry kind.
    pub fn kind(&self) -> AssetKind {
        match self.geometry {
            Geometry::Point(_) => AssetKind::PointFeature,
            Geometry::Ring(_) => AssetKind::RegionBoundary,
        }
    }

    /// Point position, if this is a point asset with coordinates.
    pub fn position(&self) -> Option<Coordinate> {
        match self.geometry {
            Geometry::Point(position) => position,
            Geometry::Ring(_) => None,
        }
    }

    /// Boundary ring; empty for point assets.
    pub fn ring(&self) -> Ring<'_> {
        match &self.geometry {
            Geometry::Ring(vertices) => Ring::new(vertices),
            Geometry::Point(_) => Ring::new(&[]),
        }
    }
}

/// Named categories of the network folder taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    /// `HP/HOME`
    SubscriberHome,
    /// `HP/HOME-BIZ`
    SubscriberHomeBusiness,
    /// `POLE`
    Pole,
    /// `FDT`
    DistributionBox,
    /// `FAT`
    DistributionPoint,
    /// `CABLE DISTRIBUTION`
    DistributionCable,
    /// `CABLE DROP`
    DropCable,
    /// `SLINGEWIRE`
    SuspensionWire,
    /// `HOOK`
    Hook,
    /// `BOUNDARY FAT`
    BoundaryRegion,
    /// `QSPAN`
    SpanMarker,
}

impl AssetCategory {
    /// Number of categories.
    pub const COUNT: usize = 11;

    /// Every category, in taxonomy order.
    pub const ALL: [AssetCategory; Self::COUNT] = [
        AssetCategory::SubscriberHome,
        AssetCategory::SubscriberHomeBusiness,
        AssetCategory::Pole,
        AssetCategory::DistributionBox,
        AssetCategory::DistributionPoint,
        AssetCategory::DistributionCable,
        AssetCategory::DropCable,
        AssetCategory::SuspensionWire,
        AssetCategory::Hook,
        AssetCategory::BoundaryRegion,
        AssetCategory::SpanMarker,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Folder name of this category in the KML taxonomy.
    pub fn folder_name(&self) -> &'static str {
        match self {
            AssetCategory::SubscriberHome => "HOME",
            AssetCategory::SubscriberHomeBusiness => "HOME-BIZ",
            AssetCategory::Pole => "POLE",
            AssetCategory::DistributionBox => "FDT",
            AssetCategory::DistributionPoint => "FAT",
            AssetCategory::DistributionCable => "CABLE DISTRIBUTION",
            AssetCategory::DropCable => "CABLE DROP",
            AssetCategory::SuspensionWire => "SLINGEWIRE",
            AssetCategory::Hook => "HOOK",
            AssetCategory::BoundaryRegion => "BOUNDARY FAT",
            AssetCategory::SpanMarker => "QSPAN",
        }
    }

    /// Stable label of the category.
    pub fn label(&self) -> &'static str {
        match self {
            AssetCategory::SubscriberHome => "subscriber-home",
            AssetCategory::SubscriberHomeBusiness => "subscriber-home-business",
            AssetCategory::Pole => "pole",
            AssetCategory::DistributionBox => "distribution-box",
            AssetCategory::DistributionPoint => "distribution-point",
            AssetCategory::DistributionCable => "distribution-cable",
            AssetCategory::DropCable => "drop-cable",
            AssetCategory::SuspensionWire => "suspension-wire",
            AssetCategory::Hook => "hook",
            AssetCategory::BoundaryRegion => "boundary-region",
            AssetCategory::SpanMarker => "span-marker",
        }
    }

    /// Geometry kind extracted for this category.
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetCategory::BoundaryRegion => AssetKind::RegionBoundary,
            _ => AssetKind::PointFeature,
        }
    }

    /// Category for a folder directly below the network root.
    ///
    /// The subscriber sub-folders live one level deeper and are not matched here.
    pub fn from_network_folder(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| {
            !category.is_subscriber() && category.folder_name() == name
        })
    }

    /// Category for a folder directly below the subscriber folder.
    pub fn from_subscriber_folder(name: &str) -> Option<Self> {
        [
            AssetCategory::SubscriberHome,
            AssetCategory::SubscriberHomeBusiness,
        ]
        .into_iter()
        .find(|category| category.folder_name() == name)
    }

    /// Whether this is one of the two subscriber categories.
    pub fn is_subscriber(&self) -> bool {
        matches!(
            self,
            AssetCategory::SubscriberHome | AssetCategory::SubscriberHomeBusiness
        )
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-category asset counts reported after a document load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DocumentSummary {
    /// Residential plus business subscriber points
    pub subscribers: usize,
    /// Poles
    pub poles: usize,
    /// Boundary regions
    pub boundary_regions: usize,
    /// Distribution points
    pub distribution_points: usize,
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscribers, {} poles, {} boundary regions, {} distribution points",
            self.subscribers, self.poles, self.boundary_regions, self.distribution_points
        )
    }
}

/// All assets of one network document, grouped by category.
///
/// Built once per document and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetCollection {
    categories: [Vec<Asset>; AssetCategory::COUNT],
}

impl Default for AssetCollection {
    fn default() -> Self {
        Self {
            categories: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl AssetCollection {
    /// Build a collection from category contents. Later entries for the same
    /// category replace earlier ones.
    pub fn from_categories(entries: impl IntoIterator<Item = (AssetCategory, Vec<Asset>)>) -> Self {
        let mut collection = Self::default();
        for (category, assets) in entries {
            collection.replace(category, assets);
        }
        collection
    }

    fn replace(&mut self, category: AssetCategory, assets: Vec<Asset>) {
        self.categories[category.index()] = assets;
    }

    /// Assets of one category, in document order.
    pub fn get(&self, category: AssetCategory) -> &[Asset] {
        &self.categories[category.index()]
    }

    /// Subscriber points: residential first, then business.
    pub fn subscribers(&self) -> Vec<&Asset> {
        self.get(AssetCategory::SubscriberHome)
            .iter()
            .chain(self.get(AssetCategory::SubscriberHomeBusiness))
            .collect()
    }

    /// Poles, in document order.
    pub fn poles(&self) -> &[Asset] {
        self.get(AssetCategory::Pole)
    }

    /// Boundary regions, in document order.
    pub fn boundary_regions(&self) -> &[Asset] {
        self.get(AssetCategory::BoundaryRegion)
    }

    /// Name of the first distribution box, or `default` when there is none.
    pub fn distribution_box_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.get(AssetCategory::DistributionBox)
            .first()
            .map(|asset| asset.name.as_str())
            .unwrap_or(default)
    }

    /// Total number of assets over all categories.
    pub fn total(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Counts reported after a document load.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            subscribers: self.get(AssetCategory::SubscriberHome).len()
                + self.get(AssetCategory::SubscriberHomeBusiness).len(),
            poles: self.poles().len(),
            boundary_regions: self.boundary_regions().len(),
            distribution_points: self.get(AssetCategory::DistributionPoint).len(),
        }
    }
}

/// Walks the folder taxonomy of a parsed KML tree.
#[derive(Debug, Clone)]
pub struct AssetParser {
    network_root: String,
}

impl Default for AssetParser {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_ROOT)
    }
}

impl AssetParser {
    /// Create a parser looking for the given network root folder name.
    pub fn new(network_root: impl Into<String>) -> Self {
        Self {
            network_root: network_root.into(),
        }
    }

    /// Parse KML text and extract its assets.
    pub fn parse_str(&self, kml: &str) -> Result<AssetCollection> {
        let tree = MarkupTree::parse(kml)?;
        Ok(self.parse(&tree))
    }

    /// Extract assets from a parsed tree.
    ///
    /// Every folder named like the network root is processed, in document
    /// order; a category found again replaces the earlier contents.
    pub fn parse(&self, tree: &MarkupTree) -> AssetCollection {
        let mut collection = AssetCollection::default();

        for folder in tree.find_all("Folder") {
            match folder_name(tree, folder) {
                Some(name) if name == self.network_root => {
                    self.parse_network_root(tree, folder, &mut collection);
                },
                _ => {},
            }
        }

        log::info!(
            "Extracted {} assets ({})",
            collection.total(),
            collection.summary()
        );
        collection
    }

    fn parse_network_root(&self, tree: &MarkupTree, root: NodeId, out: &mut AssetCollection) {
        for folder in tree.children_named(root, "Folder") {
            let Some(name) = folder_name(tree, folder) else {
                continue;
            };

            if name == SUBSCRIBER_FOLDER {
                for sub in tree.children_named(folder, "Folder") {
                    if let Some(category) = folder_name(tree, sub)
                        .as_deref()
                        .and_then(AssetCategory::from_subscriber_folder)
                    {
                        out.replace(category, extract(tree, sub, category.kind()));
                    }
                }
            } else if let Some(category) = AssetCategory::from_network_folder(&name) {
                log::debug!("Extracting folder '{}' as {}", name, category);
                out.replace(category, extract(tree, folder, category.kind()));
            } else {
                log::debug!("Ignoring unrecognized folder '{}'", name);
            }
        }
    }
}

/// Text of the first `name` element below a folder; empty names count as absent.
fn folder_name(tree: &MarkupTree, folder: NodeId) -> Option<String> {
    tree.first_text(folder, "name").filter(|name| !name.is_empty())
}

fn extract(tree: &MarkupTree, container: NodeId, kind: AssetKind) -> Vec<Asset> {
    tree.descendants_named(container, "Placemark")
        .map(|placemark| {
            let name = tree.first_text(placemark, "name").unwrap_or_default();
            match kind {
                AssetKind::PointFeature => {
                    let position = tree
                        .select_first(placemark, POINT_PATH)
                        .and_then(|node| parse_point(&tree.text_content(node)));
                    Asset::point(name, position)
                },
                AssetKind::RegionBoundary => {
                    let ring = tree
                        .select_first(placemark, RING_PATH)
                        .map(|node| parse_ring(&tree.text_content(node)))
                        .unwrap_or_default();
                    Asset::region(name, ring)
                },
            }
        })
        .collect()
}
