//! Test suite fixture.  Should only be used by this library.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indoc::formatdoc;

use crate::config::ExportConfig;
use crate::engine::{ContainerEngine, EngineCli, ImageEntry};
use crate::prompt::Confirm;

/// An in-memory engine which records the mutating calls made on it.
#[derive(Debug, Default)]
pub(crate) struct FakeEngine {
    images: Vec<ImageEntry>,
    dangling: RefCell<Vec<String>>,
    containers: Vec<String>,
    driver: String,
    fail_removal: bool,
    keep_dangling: bool,
    fail_save_of: Option<String>,
    watched_info_file: Option<Utf8PathBuf>,
    info_file_present_at_removal: Cell<Option<bool>>,
    removed: RefCell<Vec<String>>,
    saved: RefCell<Vec<Vec<String>>>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self {
            driver: "overlay2".into(),
            ..Default::default()
        }
    }

    pub(crate) fn image(mut self, id: &str, tag: &str) -> Self {
        self.images.push(ImageEntry {
            id: id.into(),
            tags: vec![tag.into()],
        });
        self
    }

    pub(crate) fn dangling(self, ids: &[&str]) -> Self {
        self.dangling
            .borrow_mut()
            .extend(ids.iter().map(|&s| s.to_owned()));
        self
    }

    pub(crate) fn containers(mut self, ids: &[&str]) -> Self {
        self.containers = ids.iter().map(|&s| s.to_owned()).collect();
        self
    }

    pub(crate) fn fail_removal(mut self) -> Self {
        self.fail_removal = true;
        self
    }

    pub(crate) fn keep_dangling_on_removal(mut self) -> Self {
        self.keep_dangling = true;
        self
    }

    pub(crate) fn fail_save_of(mut self, tag: &str) -> Self {
        self.fail_save_of = Some(tag.to_owned());
        self
    }

    /// Record whether this file exists at the time images are removed.
    pub(crate) fn watch_info_file(mut self, path: Utf8PathBuf) -> Self {
        self.watched_info_file = Some(path);
        self
    }

    pub(crate) fn info_file_present_at_removal(&self) -> Option<bool> {
        self.info_file_present_at_removal.get()
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.removed.borrow().clone()
    }

    pub(crate) fn saved(&self) -> Vec<Vec<String>> {
        self.saved.borrow().clone()
    }
}

impl ContainerEngine for FakeEngine {
    fn list_images(&self) -> Result<Vec<ImageEntry>> {
        Ok(self.images.clone())
    }

    fn list_dangling_images(&self) -> Result<Vec<String>> {
        Ok(self.dangling.borrow().clone())
    }

    fn list_containers(&self) -> Result<Vec<String>> {
        Ok(self.containers.clone())
    }

    fn storage_driver(&self) -> Result<String> {
        Ok(self.driver.clone())
    }

    fn remove_images(&self, ids: &[String]) -> Result<()> {
        if let Some(p) = self.watched_info_file.as_ref() {
            self.info_file_present_at_removal.set(Some(p.exists()));
        }
        if self.fail_removal {
            anyhow::bail!("image is in use by a container");
        }
        self.removed.borrow_mut().extend(ids.iter().cloned());
        if !self.keep_dangling {
            self.dangling.borrow_mut().retain(|d| !ids.contains(d));
        }
        Ok(())
    }

    fn save_images(&self, refs: &[&str], mut dest: File) -> Result<()> {
        if let Some(tag) = self.fail_save_of.as_deref() {
            anyhow::ensure!(!refs.contains(&tag), "Failed to save {tag}");
        }
        dest.write_all(refs.join(" ").as_bytes())?;
        self.saved
            .borrow_mut()
            .push(refs.iter().map(|&s| s.to_owned()).collect());
        Ok(())
    }
}

/// Lines appended to a log by a test script, or nothing if it never ran.
fn read_log(log: &Utf8Path) -> Result<Vec<String>> {
    if !log.exists() {
        return Ok(Vec::new());
    }
    let log = std::fs::read_to_string(log)?;
    Ok(log.lines().map(ToOwned::to_owned).collect())
}

fn write_script(path: &Utf8Path, script: &str) -> Result<()> {
    std::fs::write(path, script)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// The real [`EngineCli`] pointed at a shell script which logs its
/// arguments and prints canned engine output. The script is named after
/// the engine binary, so the name selects the CLI flavor.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    // Held to keep the directory alive
    _tempdir: tempfile::TempDir,
    log: Utf8PathBuf,
    pub(crate) engine: EngineCli,
}

impl ScriptedEngine {
    pub(crate) fn new(name: &str) -> Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let base = Utf8Path::from_path(tempdir.path())
            .context("Non-UTF8 tempdir")?
            .to_owned();
        let log = base.join("engine.log");
        let script = formatdoc! {r#"
            #!/bin/sh
            echo "$@" >> "{log}"
            case "$1" in
              images)
                if [ "$2" = "--filter" ]; then
                  echo sha256:dddd
                else
                  echo 'sha256:aaaa quay.io/foo/bar <none>'
                  echo 'sha256:bbbb myapp 1.0'
                  echo 'sha256:bbbb localhost:5000/myapp latest'
                fi
                ;;
              ps) echo c1; echo c2 ;;
              info) echo overlay2 ;;
              save)
                shift
                case "$1" in
                  broken*) exit 1 ;;
                esac
                echo "archive of $*"
                ;;
            esac
        "#, log = log};
        let program = base.join(name);
        write_script(&program, &script)?;
        Ok(Self {
            _tempdir: tempdir,
            log,
            engine: EngineCli::new(program.as_str()),
        })
    }

    /// Argument lines the engine was invoked with, in order.
    pub(crate) fn calls(&self) -> Result<Vec<String>> {
        read_log(&self.log)
    }
}

/// A temporary engine root with a volume store, a helper script which logs
/// its arguments, and a configuration pointing at both.
#[derive(Debug)]
pub(crate) struct Fixture {
    // Held to keep the directory alive
    _tempdir: tempfile::TempDir,
    pub(crate) graph: Utf8PathBuf,
    pub(crate) helper_log: Utf8PathBuf,
    pub(crate) config: ExportConfig,
}

impl Fixture {
    pub(crate) fn new() -> Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let base = Utf8Path::from_path(tempdir.path())
            .context("Non-UTF8 tempdir")?
            .to_owned();
        let graph = base.join("graph");
        let volume = graph.join("volumes/0123abcd/_data");
        std::fs::create_dir_all(&volume)?;
        std::fs::write(volume.join("somefile"), "volume contents")?;
        let libexec = base.join("libexec");
        std::fs::create_dir(&libexec)?;
        let config = ExportConfig {
            graph: graph.clone(),
            dir: base.join("export"),
            engine: "unused".into(),
            assume_yes: false,
            selinux: false,
            libexec: Some(libexec),
            tar: "tar".into(),
        };
        let r = Self {
            _tempdir: tempdir,
            graph,
            helper_log: base.join("helper.log"),
            config,
        };
        r.write_helper(None)?;
        Ok(r)
    }

    fn write_helper(&self, fail_id: Option<&str>) -> Result<()> {
        let mut script = formatdoc! {r#"
            #!/bin/sh
            echo "$@" >> {log}
        "#, log = self.helper_log};
        if let Some(id) = fail_id {
            script.push_str(&formatdoc! {r#"
                case "$2" in
                  --container-id={id}) exit 1 ;;
                esac
            "#, id = id});
        }
        write_script(&self.config.container_helper()?, &script)
    }

    /// Make the helper fail for the container with this short ID.
    pub(crate) fn fail_helper_for(&self, id: &str) -> Result<()> {
        self.write_helper(Some(id))
    }

    /// Argument lines the helper was invoked with, in order.
    pub(crate) fn helper_calls(&self) -> Result<Vec<String>> {
        read_log(&self.helper_log)
    }

    /// Sorted file names in a subdirectory of the export location.
    pub(crate) fn files_in(&self, subdir: &str) -> Result<Vec<String>> {
        let mut r = std::fs::read_dir(self.config.dir.join(subdir))?
            .map(|e| -> Result<String> { Ok(e?.file_name().to_string_lossy().into_owned()) })
            .collect::<Result<Vec<_>>>()?;
        r.sort();
        Ok(r)
    }

    pub(crate) fn export(&self, engine: &dyn ContainerEngine, confirm: &mut dyn Confirm) -> Result<()> {
        crate::export::export(engine, confirm, &self.config)
    }
}
