//! KMZ container access.
//!
//! A KMZ file is a ZIP archive holding one KML document (usually `doc.kml`)
//! plus optional icons and overlays. Only the first `.kml` entry is used.

use crate::error::{Error, Result};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// Suffix identifying the markup entry inside the archive.
pub const MARKUP_SUFFIX: &str = ".kml";

/// An opened KMZ archive.
pub struct KmzArchive<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<'a> KmzArchive<Cursor<&'a [u8]>> {
    /// Open a KMZ archive held in memory.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> KmzArchive<R> {
    /// Open a KMZ archive from any seekable reader.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::decode("Failed to open KMZ archive", e))?;
        Ok(Self { archive })
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Name of the first entry whose name ends with `.kml` (case-insensitive).
    ///
    /// Only the central directory is consulted; no entry is opened.
    pub fn markup_entry(&self) -> Option<String> {
        self.archive
            .file_names()
            .find(|name| name.to_lowercase().ends_with(MARKUP_SUFFIX))
            .map(str::to_string)
    }

    /// Decode an entry as text. Invalid UTF-8 sequences are replaced.
    ///
    /// The size declared by the archive is not trusted for allocation.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|e| Error::decode(&format!("Failed to open entry '{}'", name), e))?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::decode(&format!("Failed to inflate entry '{}'", name), e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Locate and decode the markup document.
    ///
    /// A missing or empty `.kml` entry is a decode error.
    pub fn read_markup(&mut self) -> Result<String> {
        let name = self
            .markup_entry()
            .ok_or_else(|| Error::Decode("No KML document found in KMZ archive".to_string()))?;
        log::debug!("Reading markup entry '{}'", name);

        let text = self.read_text(&name)?;
        if text.is_empty() {
            return Err(Error::Decode(format!("KML entry '{}' is empty", name)));
        }
        Ok(text)
    }
}
