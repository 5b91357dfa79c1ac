//! # Export configuration
//!
//! Configuration normally comes from the command line. Alternatively the
//! `ATOMIC_MIGRATE_CONFIG` environment variable may name a YAML file
//! holding the same settings, in which case no options may be passed.

use anyhow::{ensure, Context, Result};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::archive::{Archiver, DEFAULT_TAR};
use crate::cli::ExportOpts;

/// Environment variable naming a YAML configuration file.
const CONFIG_ENV: &str = "ATOMIC_MIGRATE_CONFIG";
/// Environment variable overriding the directory holding helper scripts.
const LIBEXEC_ENV: &str = "ATOMIC_LIBEXEC";
const DEFAULT_LIBEXEC: &str = "/usr/libexec/atomic";
/// The per-container export helper, relative to the libexec directory.
const CONTAINER_HELPER: &str = "migrate.sh";

pub(crate) const DEFAULT_GRAPH: &str = "/var/lib/docker";
pub(crate) const DEFAULT_EXPORT_DIR: &str = "/var/lib/atomic/migrate";
pub(crate) const DEFAULT_ENGINE: &str = "docker";

fn default_graph() -> Utf8PathBuf {
    DEFAULT_GRAPH.into()
}

fn default_dir() -> Utf8PathBuf {
    DEFAULT_EXPORT_DIR.into()
}

fn default_engine() -> String {
    DEFAULT_ENGINE.into()
}

fn default_tar() -> Utf8PathBuf {
    DEFAULT_TAR.into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct ExportConfig {
    /// Root of the engine's on-disk state.
    #[serde(default = "default_graph")]
    pub(crate) graph: Utf8PathBuf,
    /// Directory the export is written into.
    #[serde(default = "default_dir")]
    pub(crate) dir: Utf8PathBuf,
    /// The engine command line client.
    #[serde(default = "default_engine")]
    pub(crate) engine: String,
    /// Remove dangling images without asking.
    #[serde(default)]
    pub(crate) assume_yes: bool,
    /// Preserve SELinux labels in volume archives.
    #[serde(default = "default_true")]
    pub(crate) selinux: bool,
    /// Directory holding `migrate.sh`; defaults to `$ATOMIC_LIBEXEC`.
    #[serde(default)]
    pub(crate) libexec: Option<Utf8PathBuf>,
    /// The tar binary.
    #[serde(default = "default_tar")]
    pub(crate) tar: Utf8PathBuf,
}

impl ExportConfig {
    pub(crate) fn from_opts(opts: ExportOpts) -> Self {
        Self {
            graph: opts.graph,
            dir: opts.dir,
            engine: opts.engine,
            assume_yes: opts.assume_yes,
            selinux: !opts.no_selinux,
            libexec: None,
            tar: default_tar(),
        }
    }

    pub(crate) fn from_yaml(buf: &[u8]) -> Result<Self> {
        let r = serde_yaml::from_slice(buf)?;
        Ok(r)
    }

    /// Load from the file named by `ATOMIC_MIGRATE_CONFIG` if set, otherwise
    /// use the parsed command line options.
    pub(crate) fn load(opts: ExportOpts) -> Result<Self> {
        let Some(path) = crate::utils::getenv_utf8(CONFIG_ENV)? else {
            return Ok(Self::from_opts(opts));
        };
        ensure!(
            opts.is_default(),
            "{CONFIG_ENV} is set, but options were also provided on the command line"
        );
        let buf = std::fs::read(&path).with_context(|| format!("Reading {CONFIG_ENV} file {path}"))?;
        tracing::debug!("Loaded configuration from {path}");
        Self::from_yaml(&buf).with_context(|| format!("Parsing {CONFIG_ENV} file {path}"))
    }

    /// The directory holding helper scripts.
    pub(crate) fn libexec_dir(&self) -> Result<Utf8PathBuf> {
        if let Some(d) = self.libexec.as_ref() {
            return Ok(d.clone());
        }
        Ok(crate::utils::getenv_utf8(LIBEXEC_ENV)?
            .unwrap_or_else(|| DEFAULT_LIBEXEC.to_owned())
            .into())
    }

    /// Path to the per-container export helper.
    pub(crate) fn container_helper(&self) -> Result<Utf8PathBuf> {
        Ok(self.libexec_dir()?.join(CONTAINER_HELPER))
    }

    pub(crate) fn archiver(&self) -> Archiver {
        Archiver::new(self.tar.clone(), self.selinux)
    }
}
