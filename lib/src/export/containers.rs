//! Exporting containers by delegating each one to the helper script.

use std::process::Command;

use anyhow::Result;
use atomic_migrate_utils::CommandRunExt;
use camino::Utf8Path;
use fn_error_context::context;

use super::{short_id, ExportLocation};
use crate::engine::ContainerEngine;

const CONTAINERS_DIR: &str = "containers";

fn helper_command(helper: &Utf8Path, id: &str, graph: &Utf8Path, location: &Utf8Path) -> Command {
    let mut cmd = Command::new(helper);
    cmd.arg("export")
        .arg(format!("--container-id={}", short_id(id)))
        .arg(format!("--graph={graph}"))
        .arg(format!("--export-location={location}"));
    cmd
}

/// Export every container, running or stopped. The helper owns the
/// on-disk format below `containers/`; the first failure stops the run.
#[context("Exporting containers")]
pub(super) fn export_containers(
    engine: &dyn ContainerEngine,
    helper: &Utf8Path,
    graph: &Utf8Path,
    location: &ExportLocation,
) -> Result<()> {
    location.subdir(CONTAINERS_DIR)?;
    for id in engine.list_containers()? {
        println!("Exporting container: {}", short_id(&id));
        helper_command(helper, &id, graph, location.path()).run_with_cmd_context()?;
    }
    Ok(())
}
