//! # Exporting engine state to a directory
//!
//! The export captures images, containers and volumes of a container
//! engine host into a flat directory, along with the name of the storage
//! driver in use so that an import can verify it targets the same layout.
//!
//! The pipeline is strictly sequential and all-or-nothing: the first error
//! aborts the run, and partially written output is left in place.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std_ext::cap_std;
use cap_std_ext::cap_std::fs::Dir;
use cap_std_ext::dirext::CapStdExtDirExt;
use fn_error_context::context;

use crate::config::ExportConfig;
use crate::engine::ContainerEngine;
use crate::error::ExportError;
use crate::prompt::Confirm;

mod containers;
mod images;
mod volumes;

/// Records the storage driver, directly under the export location.
const INFO_FILE: &str = "info.txt";
const PRUNE_PROMPT: &str =
    "There are dangling images in your system. Would you like atomic to prune them [y/N]";

/// Identifiers are shown truncated to this many characters.
const SHORT_ID_LEN: usize = 12;

/// The short form of an engine identifier, used for progress output and
/// as the container argument of the export helper.
pub(crate) fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// The directory an export is written into.
#[derive(Debug)]
pub(crate) struct ExportLocation {
    path: Utf8PathBuf,
    dir: Dir,
}

impl ExportLocation {
    /// Open the export directory, creating it and its parents if needed.
    #[context("Preparing export location {path}")]
    pub(crate) fn create(path: &Utf8Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let dir = Dir::open_ambient_dir(path, cap_std::ambient_authority())?;
        Ok(Self {
            path: path.to_owned(),
            dir,
        })
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Ensure the named subdirectory exists, returning its full path.
    pub(crate) fn subdir(&self, name: &str) -> Result<Utf8PathBuf> {
        self.dir
            .create_dir_all(name)
            .with_context(|| format!("Creating {}/{name}", self.path))?;
        Ok(self.path.join(name))
    }

    /// Create (or truncate) a file below the export location.
    pub(crate) fn create_file(&self, relpath: &Utf8Path) -> Result<std::fs::File> {
        let f = self
            .dir
            .create(relpath)
            .with_context(|| format!("Creating {}/{relpath}", self.path))?;
        Ok(f.into_std())
    }

    /// Persist the storage driver name, verbatim.
    #[context("Writing {INFO_FILE}")]
    pub(crate) fn write_storage_info(&self, driver: &str) -> Result<()> {
        self.dir.atomic_write(INFO_FILE, driver)?;
        Ok(())
    }
}

/// Delete dangling images if the operator agrees; otherwise refuse to
/// continue. Nothing is written by this step.
#[context("Checking for dangling images")]
fn prune_dangling_images(engine: &dyn ContainerEngine, confirm: &mut dyn Confirm) -> Result<()> {
    let dangling = engine.list_dangling_images()?;
    if dangling.is_empty() {
        tracing::debug!("No dangling images");
        return Ok(());
    }
    tracing::debug!("Found {} dangling images", dangling.len());
    if !confirm.confirm(PRUNE_PROMPT)? {
        return Err(ExportError::DanglingImagesPresent.into());
    }
    println!("Deleting dangling images");
    engine
        .remove_images(&dangling)
        .map_err(|e| ExportError::DanglingRemovalFailed { source: e.into() })?;
    let remaining = engine.list_dangling_images()?;
    if !remaining.is_empty() {
        return Err(ExportError::DanglingImagesRemain { ids: remaining }.into());
    }
    Ok(())
}

/// Export images, containers and volumes of the engine into `config.dir`.
pub(crate) fn export(
    engine: &dyn ContainerEngine,
    confirm: &mut dyn Confirm,
    config: &ExportConfig,
) -> Result<()> {
    let location = ExportLocation::create(&config.dir)?;

    prune_dangling_images(engine, confirm)?;

    let driver = engine.storage_driver()?;
    tracing::debug!("Storage driver: {driver}");
    location.write_storage_info(&driver)?;

    images::export_images(engine, &location)?;
    let helper = config.container_helper()?;
    containers::export_containers(engine, &helper, &config.graph, &location)?;
    volumes::export_volumes(&config.archiver(), &config.graph, &location)?;

    println!("atomic export completed successfully");
    Ok(())
}
