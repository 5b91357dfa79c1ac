//! # Talking to the container engine
//!
//! The export only needs a handful of queries and two mutating operations
//! from the engine; they are expressed as the [`ContainerEngine`] trait.
//! [`EngineCli`] implements it by driving the engine's command line client
//! (`docker`, or the CLI-compatible `podman`).

use std::fs::File;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use atomic_migrate_utils::CommandRunExt;
use fn_error_context::context;

/// What the engine prints for a missing repository or tag.
const NONE: &str = "<none>";

/// Pass only this many image IDs at a time to a single `rmi`, to avoid
/// overflowing the argument vector.
const SUBCMD_ARGV_CHUNKING: usize = 100;

/// One entry of the image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageEntry {
    /// Full (untruncated) image ID
    pub(crate) id: String,
    /// References that point at this ID, possibly the untagged placeholder
    pub(crate) tags: Vec<String>,
}

impl ImageEntry {
    /// Whether the engine reported this image without a usable tag: either
    /// `<none>:<none>`, or `repo:<none>` for images pulled only by digest.
    pub(crate) fn is_untagged(&self) -> bool {
        self.tags.iter().any(|t| {
            t.rsplit_once(':')
                .is_some_and(|(repo, tag)| repo == NONE || tag == NONE)
        })
    }
}

/// The operations the export needs from a live container engine.
pub(crate) trait ContainerEngine {
    /// List all images; an ID may appear in several entries.
    fn list_images(&self) -> Result<Vec<ImageEntry>>;
    /// List the IDs of images which have no tag at all.
    fn list_dangling_images(&self) -> Result<Vec<String>>;
    /// List the IDs of all containers, including stopped ones.
    fn list_containers(&self) -> Result<Vec<String>>;
    /// The name of the active storage (graph) driver.
    fn storage_driver(&self) -> Result<String>;
    /// Forcibly remove the given images.
    fn remove_images(&self, ids: &[String]) -> Result<()>;
    /// Save the named references as a single archive, written to `dest`.
    fn save_images(&self, refs: &[&str], dest: File) -> Result<()>;
}

/// The engine CLIs differ only in how `info` exposes the storage driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Docker,
    Podman,
}

impl Flavor {
    fn for_program(program: &str) -> Self {
        match Path::new(program).file_name() {
            Some(n) if n == "podman" => Self::Podman,
            _ => Self::Docker,
        }
    }

    fn driver_format(self) -> &'static str {
        match self {
            Self::Docker => "{{.Driver}}",
            Self::Podman => "{{.Store.GraphDriverName}}",
        }
    }
}

/// A [`ContainerEngine`] implemented by invoking the engine CLI binary.
#[derive(Debug, Clone)]
pub(crate) struct EngineCli {
    program: String,
    flavor: Flavor,
}

impl EngineCli {
    pub(crate) fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let flavor = Flavor::for_program(&program);
        Self { program, flavor }
    }

    fn cmd<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn read_ids<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
        let out = self.cmd(args).run_get_string()?;
        Ok(parse_id_listing(&out))
    }
}

impl ContainerEngine for EngineCli {
    #[context("Listing images")]
    fn list_images(&self) -> Result<Vec<ImageEntry>> {
        let out = self
            .cmd([
                "images",
                "--no-trunc",
                "--format",
                "{{.ID}} {{.Repository}} {{.Tag}}",
            ])
            .run_get_string()?;
        parse_image_listing(&out)
    }

    #[context("Listing dangling images")]
    fn list_dangling_images(&self) -> Result<Vec<String>> {
        self.read_ids([
            "images",
            "--filter",
            "dangling=true",
            "--quiet",
            "--no-trunc",
        ])
    }

    #[context("Listing containers")]
    fn list_containers(&self) -> Result<Vec<String>> {
        self.read_ids(["ps", "--all", "--quiet", "--no-trunc"])
    }

    #[context("Querying storage driver")]
    fn storage_driver(&self) -> Result<String> {
        let out = self
            .cmd(["info", "--format", self.flavor.driver_format()])
            .run_get_string()?;
        let driver = out.trim_end_matches('\n');
        anyhow::ensure!(!driver.is_empty(), "Engine reported an empty storage driver");
        Ok(driver.to_owned())
    }

    #[context("Removing images")]
    fn remove_images(&self, ids: &[String]) -> Result<()> {
        for chunk in ids.chunks(SUBCMD_ARGV_CHUNKING) {
            self.cmd(["rmi", "--force"])
                .args(chunk)
                .run_with_cmd_context()?;
        }
        Ok(())
    }

    fn save_images(&self, refs: &[&str], dest: File) -> Result<()> {
        anyhow::ensure!(!refs.is_empty(), "No image references to save");
        self.cmd(["save"])
            .args(refs)
            .stdout(dest)
            .run_with_cmd_context()
            .with_context(|| format!("Saving {}", refs.join(" ")))
    }
}

/// Parse output with one ID per line, ignoring blank lines.
fn parse_id_listing(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parse `<id> <repository> <tag>` lines; each line yields one entry
/// whose reference is `<repository>:<tag>`.
fn parse_image_listing(s: &str) -> Result<Vec<ImageEntry>> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let mut fields = l.split_whitespace();
            let (Some(id), Some(repo), Some(tag), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                anyhow::bail!("Invalid image listing line: {l}");
            };
            Ok(ImageEntry {
                id: id.to_owned(),
                tags: vec![format!("{repo}:{tag}")],
            })
        })
        .collect()
}
