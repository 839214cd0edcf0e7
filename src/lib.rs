//! # KMZ Oxide
//!
//! Ingestion of fiber-network survey documents (KMZ) into template-shaped
//! delimited text for downstream asset registers.
//!
//! ## Core Features
//!
//! - **Container**: Opens the KMZ archive and decodes its first `.kml` entry
//! - **Asset Parsing**: Walks the `DISTRIBUSI` folder taxonomy into typed
//!   point features and region boundaries
//! - **Spatial Assignment**: Groups subscriber points under the boundary
//!   region containing them (ray casting)
//! - **Tabular I/O**: Delimiter-sniffing template parsing and quoted output
//! - **Field Mapping**: Per-column data sources resolved for every asset
//!
//! ## Quick Start
//!
//! ```ignore
//! use kmz_oxide::config::PipelineConfig;
//! use kmz_oxide::mapping::FieldMapping;
//! use kmz_oxide::pipeline::{load_template, OutputKind, PipelineRun};
//! use kmz_oxide::tabular::TabularMode;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let run = PipelineRun::load_document(
//!     "network.kmz",
//!     &std::fs::read("network.kmz")?,
//!     PipelineConfig::default(),
//! )?;
//! println!("{}", run.summary());
//!
//! let template = load_template("homepass.csv", &std::fs::read("homepass.csv")?, TabularMode::Compat)?;
//! let mut mapping = FieldMapping::for_schema(&template);
//! mapping.apply_subscriber_shortcuts();
//!
//! let output = run.process(OutputKind::Subscriber, &template, &mapping)?;
//! std::fs::write(output.file_name(), output.to_text(TabularMode::Compat)?)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Document decoding
pub mod container;
pub mod geometry;
pub mod markup;

// Network model
pub mod assets;
pub mod spatial;

// Templates and output
pub mod mapping;
pub mod tabular;

// Configuration
pub mod config;

// Processing runs
pub mod pipeline;

// Re-exports
pub use assets::{Asset, AssetCategory, AssetCollection, AssetParser, DocumentSummary};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use geometry::Coordinate;
pub use mapping::{FieldMapping, FieldSource};
pub use pipeline::{OutputKind, PipelineRun, ProcessedOutput, Session};
pub use tabular::{TabularDataset, TabularMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
