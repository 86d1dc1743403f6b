//! The raster I/O seam.
//!
//! The engine never touches files directly. Everything goes through a
//! [`RasterIo`]: [`GeoTiffIo`] for real files and [`MemoryRasterIo`] for
//! in-memory rasters in tests and embedding applications.

use crate::SourceDescriptor;
use mosaic_raster::{
    read_header, read_raster, resample, AlignedBuffer, GeoTiffWriter, GridSpec, OutputRaster,
    Raster, RasterError, RasterHeader, ResamplingKernel, WriteOptions,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Raster operations the engine consumes.
///
/// Implementations must be shareable across the alignment worker threads.
pub trait RasterIo: Sync {
    /// Read a raster's metadata.
    fn open(&self, path: &Path) -> mosaic_raster::Result<RasterHeader>;

    /// Resample a source onto `grid`.
    fn resample(
        &self,
        source: &SourceDescriptor,
        grid: &GridSpec,
        kernel: ResamplingKernel,
    ) -> mosaic_raster::Result<AlignedBuffer>;

    /// Encode `raster` to `path`. Must not leave a complete-looking file
    /// behind on failure.
    fn write(
        &self,
        path: &Path,
        raster: &OutputRaster,
        options: &WriteOptions,
    ) -> mosaic_raster::Result<()>;
}

/// GeoTIFF files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffIo;

impl GeoTiffIo {
    /// Create a new GeoTIFF I/O backend.
    pub fn new() -> Self {
        Self
    }
}

impl RasterIo for GeoTiffIo {
    fn open(&self, path: &Path) -> mosaic_raster::Result<RasterHeader> {
        read_header(path)
    }

    fn resample(
        &self,
        source: &SourceDescriptor,
        grid: &GridSpec,
        kernel: ResamplingKernel,
    ) -> mosaic_raster::Result<AlignedBuffer> {
        let raster = read_raster(&source.path)?;
        resample(&raster, grid, kernel)
    }

    /// Encodes into a temporary file next to `path`, then renames it over
    /// `path`. The temporary file is removed if anything fails.
    fn write(
        &self,
        path: &Path,
        raster: &OutputRaster,
        options: &WriteOptions,
    ) -> mosaic_raster::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let write_atomic = || -> mosaic_raster::Result<()> {
            let mut partial = tempfile::Builder::new()
                .prefix(".mosaic-")
                .suffix(".partial")
                .tempfile_in(dir)?;
            {
                let mut out = BufWriter::new(partial.as_file_mut());
                GeoTiffWriter::new(raster).options(*options).write_to(&mut out)?;
                out.flush()?;
            }
            partial.as_file().sync_all()?;
            partial.persist(path).map_err(|e| e.error)?;
            Ok(())
        };
        write_atomic().map_err(|e| RasterError::writing(path, e))?;

        debug!(path = %path.display(), compression = %options.compression, "output finalised");
        Ok(())
    }
}

/// In-memory rasters keyed by path.
///
/// Counts resample calls and captures every write instead of encoding it.
#[derive(Debug, Default)]
pub struct MemoryRasterIo {
    rasters: HashMap<PathBuf, Raster>,
    resample_calls: AtomicUsize,
    writes: Mutex<Vec<(PathBuf, OutputRaster)>>,
}

impl MemoryRasterIo {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, raster: Raster) {
        self.rasters.insert(path.into(), raster);
    }

    /// Builder form of [`MemoryRasterIo::insert`].
    pub fn with_raster(mut self, path: impl Into<PathBuf>, raster: Raster) -> Self {
        self.insert(path, raster);
        self
    }

    /// Descriptor for a registered raster.
    pub fn descriptor(&self, path: impl AsRef<Path>) -> Option<SourceDescriptor> {
        let path = path.as_ref();
        self.rasters
            .get(path)
            .map(|r| SourceDescriptor::from_header(path, &r.header))
    }

    /// Number of [`RasterIo::resample`] calls so far.
    pub fn resample_calls(&self) -> usize {
        self.resample_calls.load(Ordering::SeqCst)
    }

    /// Every raster written so far, in order.
    pub fn writes(&self) -> Vec<(PathBuf, OutputRaster)> {
        self.writes.lock().clone()
    }

    /// The most recent raster written to `path`.
    pub fn written(&self, path: impl AsRef<Path>) -> Option<OutputRaster> {
        let path = path.as_ref();
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, r)| r.clone())
    }

    fn get(&self, path: &Path) -> mosaic_raster::Result<&Raster> {
        self.rasters
            .get(path)
            .ok_or_else(|| RasterError::NotFound(path.to_path_buf()))
    }
}

impl RasterIo for MemoryRasterIo {
    fn open(&self, path: &Path) -> mosaic_raster::Result<RasterHeader> {
        Ok(self.get(path)?.header.clone())
    }

    fn resample(
        &self,
        source: &SourceDescriptor,
        grid: &GridSpec,
        kernel: ResamplingKernel,
    ) -> mosaic_raster::Result<AlignedBuffer> {
        self.resample_calls.fetch_add(1, Ordering::SeqCst);
        resample(self.get(&source.path)?, grid, kernel)
    }

    fn write(
        &self,
        path: &Path,
        raster: &OutputRaster,
        _options: &WriteOptions,
    ) -> mosaic_raster::Result<()> {
        raster.check_size()?;
        self.writes.lock().push((path.to_path_buf(), raster.clone()));
        Ok(())
    }
}
