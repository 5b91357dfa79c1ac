//! Saving images, one archive per unique image ID.

use std::collections::HashMap;

use anyhow::Result;
use camino::Utf8Path;
use fn_error_context::context;

use super::{short_id, ExportLocation};
use crate::engine::{ContainerEngine, ImageEntry};

const IMAGES_DIR: &str = "images";

/// An image ID and every tag referring to it.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct ImageGroup {
    pub(super) id: String,
    pub(super) tags: Vec<String>,
}

/// Merge listing entries by image ID, dropping untagged images. Groups are
/// returned in the order their ID was first seen; tags keep their order
/// and are not repeated.
pub(super) fn group_by_id(entries: impl IntoIterator<Item = ImageEntry>) -> Vec<ImageGroup> {
    let mut groups: Vec<ImageGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        if entry.is_untagged() {
            tracing::debug!("Skipping untagged image {}", entry.id);
            continue;
        }
        let i = *index.entry(entry.id.clone()).or_insert_with(|| {
            groups.push(ImageGroup {
                id: entry.id.clone(),
                tags: Vec::new(),
            });
            groups.len() - 1
        });
        let tags = &mut groups[i].tags;
        for tag in entry.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    groups
}

/// Save every tagged image into `images/<full-id>`, naming all of its tags
/// in a single save so each image is stored once with its aliases.
#[context("Exporting images")]
pub(super) fn export_images(engine: &dyn ContainerEngine, location: &ExportLocation) -> Result<()> {
    location.subdir(IMAGES_DIR)?;
    let groups = group_by_id(engine.list_images()?);
    tracing::debug!("Exporting {} images", groups.len());
    for group in groups {
        println!("Exporting image: {}", short_id(&group.id));
        let dest = location.create_file(&Utf8Path::new(IMAGES_DIR).join(&group.id))?;
        let refs = group.tags.iter().map(String::as_str).collect::<Vec<_>>();
        engine.save_images(&refs, dest)?;
    }
    Ok(())
}
