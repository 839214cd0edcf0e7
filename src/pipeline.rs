//! Processing runs and the operation boundary.
//!
//! A [`PipelineRun`] is an immutable value holding the assets of one loaded
//! network document and the configuration it was loaded with. Process steps
//! borrow the run and a template and return a fresh [`ProcessedOutput`];
//! nothing is shared or mutated between runs.
//!
//! [`Session`] keeps the latest successful result of each operation (document
//! load, template loads, process steps). Every operation computes its new
//! value first and only then swaps it in, so a failed operation leaves the
//! previous state untouched.
//!
//! # Example
//!
//! ```ignore
//! use kmz_oxide::pipeline::{OutputKind, Session};
//! use kmz_oxide::mapping::FieldMapping;
//!
//! let mut session = Session::default();
//! session.load_document("network.kmz", &std::fs::read("network.kmz")?)?;
//! session.load_template(OutputKind::Subscriber, "homepass.csv", &std::fs::read("homepass.csv")?)?;
//!
//! let mut mapping = FieldMapping::for_schema(session.template(OutputKind::Subscriber).unwrap());
//! mapping.apply_subscriber_shortcuts();
//! session.process(OutputKind::Subscriber, &mapping)?;
//!
//! let (file_name, bytes) = session.export(OutputKind::Subscriber)?;
//! std::fs::write(file_name, bytes)?;
//! ```

use crate::assets::{AssetCollection, AssetParser, DocumentSummary};
use crate::config::PipelineConfig;
use crate::container::KmzArchive;
use crate::error::{Error, Result};
use crate::mapping::{
    asset_rows, subscriber_rows, ComputedAttribute, FieldMapping, FieldSource, FixedAttribute,
    OutputRow, RowContext,
};
use crate::spatial::assign;
use crate::tabular::{self, TabularDataset, TabularMode};
use std::fmt;
use std::sync::Arc;

/// Extension accepted for network documents.
pub const DOCUMENT_EXTENSION: &str = "kmz";

/// Extension accepted for templates.
pub const TEMPLATE_EXTENSION: &str = "csv";

/// The two output pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Subscriber points grouped by boundary region
    Subscriber,
    /// Poles in document order
    Pole,
}

impl OutputKind {
    /// Fixed download name of this output.
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputKind::Subscriber => "processed_homepass.csv",
            OutputKind::Pole => "processed_pole.csv",
        }
    }

    /// Sources that must be mapped when core columns are required.
    fn core_sources(&self) -> &'static [FieldSource] {
        const SUBSCRIBER: &[FieldSource] = &[
            FieldSource::Fixed(FixedAttribute::Name),
            FieldSource::Computed(ComputedAttribute::AssignedRegion),
        ];
        const POLE: &[FieldSource] = &[FieldSource::Fixed(FixedAttribute::Name)];
        match self {
            OutputKind::Subscriber => SUBSCRIBER,
            OutputKind::Pole => POLE,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Subscriber => f.write_str("subscriber"),
            OutputKind::Pole => f.write_str("pole"),
        }
    }
}

/// Reject a file whose name does not carry the expected extension.
pub fn check_extension(file_name: &str, expected: &'static str) -> Result<()> {
    let suffix = format!(".{}", expected);
    if file_name.to_lowercase().ends_with(&suffix) {
        Ok(())
    } else {
        Err(Error::Format {
            expected,
            file_name: file_name.to_string(),
        })
    }
}

/// Decode and parse a template upload.
///
/// The header line must name at least one column.
pub fn load_template(file_name: &str, bytes: &[u8], mode: TabularMode) -> Result<TabularDataset> {
    check_extension(file_name, TEMPLATE_EXTENSION)?;
    let text = String::from_utf8_lossy(bytes);
    let dataset = tabular::parse(&text, mode);

    if dataset.headers().iter().all(|h| h.is_empty()) {
        return Err(Error::Schema(format!("Template '{}' has no column headers", file_name)));
    }

    log::info!(
        "Loaded template '{}': {} columns, {} rows",
        file_name,
        dataset.headers().len(),
        dataset.rows().len()
    );
    Ok(dataset)
}

/// Result of one process step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedOutput {
    kind: OutputKind,
    headers: Vec<String>,
    rows: Vec<OutputRow>,
}

impl ProcessedOutput {
    /// Pipeline that produced the rows.
    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Output headers (the template's headers).
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Output rows.
    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    /// Download name.
    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }

    /// Serialize for download. An output without rows cannot be exported.
    pub fn to_text(&self, mode: TabularMode) -> Result<String> {
        if self.rows.is_empty() {
            return Err(Error::EmptyOutput(self.kind));
        }
        Ok(tabular::serialize_rows(&self.headers, &self.rows, mode))
    }
}

/// Assets of one loaded network document plus the run configuration.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    assets: Arc<AssetCollection>,
    config: PipelineConfig,
}

impl PipelineRun {
    /// Load a KMZ upload.
    pub fn load_document(file_name: &str, bytes: &[u8], config: PipelineConfig) -> Result<Self> {
        check_extension(file_name, DOCUMENT_EXTENSION)?;
        let markup = KmzArchive::from_bytes(bytes)?.read_markup()?;
        let run = Self::from_kml(&markup, config)?;
        log::info!("Loaded network document '{}': {}", file_name, run.assets.summary());
        Ok(run)
    }

    /// Build a run from KML text.
    pub fn from_kml(kml: &str, config: PipelineConfig) -> Result<Self> {
        let assets = AssetParser::new(config.network_root.clone()).parse_str(kml)?;
        Ok(Self::from_assets(assets, config))
    }

    /// Build a run from an already extracted collection.
    pub fn from_assets(assets: AssetCollection, config: PipelineConfig) -> Self {
        Self {
            assets: Arc::new(assets),
            config,
        }
    }

    /// Extracted assets.
    pub fn assets(&self) -> &AssetCollection {
        &self.assets
    }

    /// Per-category counts of the loaded document.
    pub fn summary(&self) -> DocumentSummary {
        self.assets.summary()
    }

    /// Run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Distribution-box label used by this run.
    pub fn distribution_box(&self) -> &str {
        self.assets
            .distribution_box_name(&self.config.default_distribution_box)
    }

    /// Run one output pipeline.
    pub fn process(
        &self,
        kind: OutputKind,
        template: &TabularDataset,
        mapping: &FieldMapping,
    ) -> Result<ProcessedOutput> {
        self.check_mapping(kind, template, mapping)?;

        let distribution_box = self.distribution_box();
        let rows = match kind {
            OutputKind::Subscriber => {
                let groups = assign(
                    self.assets.subscribers(),
                    self.assets.boundary_regions(),
                    self.config.unmatched,
                );
                subscriber_rows(&groups, mapping, distribution_box)
            },
            OutputKind::Pole => asset_rows(self.assets.poles(), mapping, distribution_box),
        };

        log::info!("Processed {} {} rows", rows.len(), kind);
        Ok(ProcessedOutput {
            kind,
            headers: template.headers().to_vec(),
            rows,
        })
    }

    fn check_mapping(
        &self,
        kind: OutputKind,
        template: &TabularDataset,
        mapping: &FieldMapping,
    ) -> Result<()> {
        if !mapping.matches_schema(template) {
            return Err(Error::Schema(
                "Field mapping was built for a different template".to_string(),
            ));
        }
        if mapping.mapped_count() == 0 {
            return Err(Error::Schema(format!(
                "No {} column has a data source",
                kind
            )));
        }
        if self.config.require_core_columns {
            for source in kind.core_sources() {
                if !mapping.uses(source) {
                    return Err(Error::Schema(format!(
                        "No {} column is mapped to {:?}",
                        kind, source
                    )));
                }
            }
        }
        Ok(())
    }

    /// Preview a source against the first asset of a pipeline.
    ///
    /// The region shown for subscribers is the first boundary region.
    pub fn preview(&self, kind: OutputKind, source: &FieldSource) -> String {
        let region = self.assets.boundary_regions().first().map(|r| r.name.as_str());
        let distribution_box = self.distribution_box();
        let sample = match kind {
            OutputKind::Subscriber => self.assets.subscribers().first().copied(),
            OutputKind::Pole => self.assets.poles().first(),
        };
        let ctx = sample.map(|asset| RowContext {
            asset,
            region: match kind {
                OutputKind::Subscriber => region,
                OutputKind::Pole => None,
            },
            distribution_box,
        });
        source.preview(ctx.as_ref())
    }
}

/// Latest successful state of each operation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: PipelineConfig,
    run: Option<Arc<PipelineRun>>,
    subscriber_template: Option<Arc<TabularDataset>>,
    pole_template: Option<Arc<TabularDataset>>,
    subscriber_output: Option<Arc<ProcessedOutput>>,
    pole_output: Option<Arc<ProcessedOutput>>,
}

impl Session {
    /// Create a session with a configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current run, if a document is loaded.
    pub fn run(&self) -> Option<&Arc<PipelineRun>> {
        self.run.as_ref()
    }

    /// Load a network document, replacing the previous one.
    ///
    /// Outputs computed from the previous document are discarded.
    pub fn load_document(&mut self, file_name: &str, bytes: &[u8]) -> Result<Arc<PipelineRun>> {
        let run = Arc::new(PipelineRun::load_document(file_name, bytes, self.config.clone())?);
        self.run = Some(Arc::clone(&run));
        self.subscriber_output = None;
        self.pole_output = None;
        Ok(run)
    }

    /// Load a template for one pipeline, replacing the previous one.
    pub fn load_template(
        &mut self,
        kind: OutputKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Arc<TabularDataset>> {
        let template = Arc::new(load_template(file_name, bytes, self.config.tabular_mode)?);
        *self.template_slot(kind) = Some(Arc::clone(&template));
        Ok(template)
    }

    /// Current template of a pipeline.
    pub fn template(&self, kind: OutputKind) -> Option<&TabularDataset> {
        match kind {
            OutputKind::Subscriber => self.subscriber_template.as_deref(),
            OutputKind::Pole => self.pole_template.as_deref(),
        }
    }

    /// Run a pipeline against the current document and template.
    pub fn process(&mut self, kind: OutputKind, mapping: &FieldMapping) -> Result<Arc<ProcessedOutput>> {
        let run = self.run.clone().ok_or(Error::MissingInput("network document"))?;
        let template = self
            .template(kind)
            .ok_or(Error::MissingInput("template"))?;

        let output = Arc::new(run.process(kind, template, mapping)?);
        *self.output_slot(kind) = Some(Arc::clone(&output));
        Ok(output)
    }

    /// Latest output of a pipeline.
    pub fn output(&self, kind: OutputKind) -> Option<&ProcessedOutput> {
        match kind {
            OutputKind::Subscriber => self.subscriber_output.as_deref(),
            OutputKind::Pole => self.pole_output.as_deref(),
        }
    }

    /// Serialize the latest output of a pipeline: download name and bytes.
    pub fn export(&self, kind: OutputKind) -> Result<(&'static str, Vec<u8>)> {
        let output = self.output(kind).ok_or(Error::EmptyOutput(kind))?;
        let text = output.to_text(self.config.tabular_mode)?;
        Ok((output.file_name(), text.into_bytes()))
    }

    fn template_slot(&mut self, kind: OutputKind) -> &mut Option<Arc<TabularDataset>> {
        match kind {
            OutputKind::Subscriber => &mut self.subscriber_template,
            OutputKind::Pole => &mut self.pole_template,
        }
    }

    fn output_slot(&mut self, kind: OutputKind) -> &mut Option<Arc<ProcessedOutput>> {
        match kind {
            OutputKind::Subscriber => &mut self.subscriber_output,
            OutputKind::Pole => &mut self.pole_output,
        }
    }
}
