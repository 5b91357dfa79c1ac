//! Compressed directory archives via tar(1).

use std::process::Command;

use anyhow::Result;
use atomic_migrate_utils::CommandRunExt;
use camino::{Utf8Path, Utf8PathBuf};
use fn_error_context::context;

/// The tar binary used unless configured otherwise.
pub(crate) const DEFAULT_TAR: &str = "/usr/bin/tar";

/// Creates gzip-compressed archives of whole directories, preserving
/// SELinux labels unless disabled.
#[derive(Debug, Clone)]
pub(crate) struct Archiver {
    tar: Utf8PathBuf,
    selinux: bool,
}

impl Archiver {
    pub(crate) fn new(tar: impl Into<Utf8PathBuf>, selinux: bool) -> Self {
        Self {
            tar: tar.into(),
            selinux,
        }
    }

    fn command(&self, srcdir: &Utf8Path, destfile: &Utf8Path) -> Command {
        let mut cmd = Command::new(&self.tar);
        cmd.args(["--create", "--gzip"]);
        if self.selinux {
            cmd.arg("--selinux");
        }
        cmd.args(["--file", destfile.as_str(), "--directory", srcdir.as_str(), "."]);
        cmd
    }

    /// Archive the contents of `srcdir` into `destfile`.
    #[context("Archiving {srcdir} to {destfile}")]
    pub(crate) fn create_archive(&self, srcdir: &Utf8Path, destfile: &Utf8Path) -> Result<()> {
        self.command(srcdir, destfile).run()
    }
}
