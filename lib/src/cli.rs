//! # Container host migration CLI
//!
//! Command line tool to move container engine state between hosts.

use std::ffi::OsString;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;

use crate::config::{ExportConfig, DEFAULT_ENGINE, DEFAULT_EXPORT_DIR, DEFAULT_GRAPH};
use crate::engine::EngineCli;
use crate::prompt::{AssumeAnswer, Confirm, ReaderPrompt};

/// Export images, containers and volumes
#[derive(Debug, Parser)]
pub(crate) struct ExportOpts {
    /// Root directory of the container engine's state.
    #[clap(long, default_value = DEFAULT_GRAPH)]
    pub(crate) graph: Utf8PathBuf,

    /// Directory to write the export into; created if missing.
    #[clap(long, default_value = DEFAULT_EXPORT_DIR)]
    pub(crate) dir: Utf8PathBuf,

    /// Container engine command line client, e.g. docker or podman; a
    /// binary named `podman` is driven as podman.
    #[clap(long, default_value = DEFAULT_ENGINE)]
    pub(crate) engine: String,

    /// Remove dangling images without prompting.
    #[clap(long, short = 'y')]
    pub(crate) assume_yes: bool,

    /// Do not preserve SELinux labels in volume archives.
    #[clap(long)]
    pub(crate) no_selinux: bool,
}

impl ExportOpts {
    /// Whether no option differs from its default.
    pub(crate) fn is_default(&self) -> bool {
        self.graph == DEFAULT_GRAPH
            && self.dir == DEFAULT_EXPORT_DIR
            && self.engine == DEFAULT_ENGINE
            && !self.assume_yes
            && !self.no_selinux
    }
}

/// Migrate container engine state between hosts.
///
/// `export` writes the images, containers and volumes of the local
/// engine into a directory, along with the storage driver in use, so that
/// the same state can be recreated on another host.
#[derive(Debug, Parser)]
#[clap(name = "atomic-migrate", version)]
#[clap(rename_all = "kebab-case")]
pub(crate) enum Opt {
    /// Export all engine state into a directory.
    ///
    /// If dangling (untagged) images exist, this asks whether to delete them
    /// first; declining aborts before anything is written.
    Export(ExportOpts),
}

/// Implementation of the `atomic-migrate export` CLI command.
async fn export(opts: ExportOpts) -> Result<()> {
    crate::utils::require_root()?;
    let config = ExportConfig::load(opts)?;
    tracing::debug!("Using {config:?}");
    let engine = EngineCli::new(config.engine.as_str());
    let mut confirm: Box<dyn Confirm> = if config.assume_yes {
        Box::new(AssumeAnswer(true))
    } else {
        Box::new(ReaderPrompt::terminal())
    };
    crate::export::export(&engine, confirm.as_mut(), &config)
}

/// Parse the provided arguments and execute.
/// Calls [`clap::Error::exit`] on failure, printing the error message and aborting the program.
pub async fn run_from_iter<I>(args: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    run_from_opt(Opt::parse_from(args)).await
}

/// Internal (non-generic/monomorphized) primary CLI entrypoint
async fn run_from_opt(opt: Opt) -> Result<()> {
    match opt {
        Opt::Export(opts) => export(opts).await,
    }
}

#[test]
fn test_parse_export_args() {
    let o = Opt::try_parse_from(["atomic-migrate", "export"]).unwrap();
    let Opt::Export(opts) = o;
    assert_eq!(opts.graph, DEFAULT_GRAPH);
    assert_eq!(opts.dir, DEFAULT_EXPORT_DIR);
    assert_eq!(opts.engine, DEFAULT_ENGINE);
    assert!(!opts.assume_yes);
    assert!(opts.is_default());

    let o = Opt::try_parse_from([
        "atomic-migrate",
        "export",
        "--graph=/srv/docker",
        "--dir",
        "/mnt/migrate",
        "--engine=podman",
        "-y",
    ])
    .unwrap();
    let Opt::Export(opts) = o;
    assert_eq!(opts.graph, "/srv/docker");
    assert_eq!(opts.dir, "/mnt/migrate");
    assert_eq!(opts.engine, "podman");
    assert!(opts.assume_yes);
    assert!(!opts.is_default());

    assert!(Opt::try_parse_from(["atomic-migrate"]).is_err());
    assert!(Opt::try_parse_from(["atomic-migrate", "import"]).is_err());
}
