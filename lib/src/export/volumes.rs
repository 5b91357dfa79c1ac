//! Archiving the engine's volume store.

use anyhow::Result;
use camino::Utf8Path;
use fn_error_context::context;

use super::ExportLocation;
use crate::archive::Archiver;

const VOLUMES_DIR: &str = "volumes";
const VOLUME_ARCHIVE: &str = "volumeData.tar.gz";
/// Only present on hosts which used the legacy vfs graph driver.
const VFS_ARCHIVE: &str = "vfsData.tar.gz";

#[context("Exporting volumes")]
pub(super) fn export_volumes(
    archiver: &Archiver,
    graph: &Utf8Path,
    location: &ExportLocation,
) -> Result<()> {
    let dest = location.subdir(VOLUMES_DIR)?;
    println!("Exporting volumes");
    archiver.create_archive(&graph.join("volumes"), &dest.join(VOLUME_ARCHIVE))?;

    let vfs = graph.join("vfs");
    if vfs.is_dir() {
        archiver.create_archive(&vfs, &dest.join(VFS_ARCHIVE))?;
    } else {
        tracing::debug!("No {vfs}");
    }
    Ok(())
}
