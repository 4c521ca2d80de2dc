//! Tag catalog persisted as a JSON file.
//!
//! Maps tag name to a badge colour and a description. The description is
//! folded into each entry's embedding context, so editing it only affects
//! entries written afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

/// Colour used when a tag has no catalog entry.
pub const DEFAULT_TAG_COLOR: &str = "#808080";

/// A named badge colour offered to admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub label: &'static str,
    pub hex: &'static str,
    pub name: &'static str,
}

/// Fixed set of badge colours.
pub const PALETTE: [PaletteColor; 7] = [
    PaletteColor { label: "Red (Emergency/ED/HR)", hex: "#FF4B4B", name: "red" },
    PaletteColor { label: "Green (OPD/Clinic/BPJS)", hex: "#2ECC71", name: "green" },
    PaletteColor { label: "Blue (IPD/Ward/MR)", hex: "#3498DB", name: "blue" },
    PaletteColor { label: "Orange (Cashier/Radiology)", hex: "#FFA500", name: "orange" },
    PaletteColor { label: "Violet (Pharmacy)", hex: "#9B59B6", name: "violet" },
    PaletteColor { label: "Gray (IT/General)", hex: "#808080", name: "gray" },
    PaletteColor { label: "Rainbow (Special)", hex: "#333333", name: "rainbow" },
];

/// Catalog data for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, alias = "desc")]
    pub description: String,
}

fn default_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

impl TagInfo {
    pub fn new(color: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            description: description.into(),
        }
    }
}

/// On-disk value: either the current object or a legacy bare colour string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTagValue {
    Info(TagInfo),
    Legacy(String),
}

impl From<StoredTagValue> for TagInfo {
    fn from(value: StoredTagValue) -> Self {
        match value {
            StoredTagValue::Info(info) => info,
            StoredTagValue::Legacy(color) => TagInfo::new(color, ""),
        }
    }
}

/// Catalog shipped with a fresh install.
pub fn default_catalog() -> BTreeMap<String, TagInfo> {
    BTreeMap::from([
        ("ED".to_string(), TagInfo::new("#FF4B4B", "IGD, Emergency, Triage")),
        ("OPD".to_string(), TagInfo::new("#2ECC71", "Rawat Jalan, Poli, Dokter")),
        ("IPD".to_string(), TagInfo::new("#3498DB", "Rawat Inap, Bangsal, Bed")),
    ])
}

/// File-backed tag catalog.
pub struct TagCatalog {
    path: PathBuf,
    tags: RwLock<BTreeMap<String, TagInfo>>,
}

impl TagCatalog {
    /// Load the catalog at `path`, creating it from `defaults` if missing.
    ///
    /// Legacy shapes are migrated and the file rewritten once.
    pub async fn open(path: impl Into<PathBuf>, defaults: BTreeMap<String, TagInfo>) -> Result<Self> {
        let path = path.into();

        let tags = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::Catalog(format!("{}: {e}", path.display())))?;
            let raw: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| StoreError::Catalog(format!("{}: {e}", path.display())))?;
            let parsed: BTreeMap<String, StoredTagValue> = serde_json::from_value(raw.clone())
                .map_err(|e| StoreError::Catalog(format!("{}: {e}", path.display())))?;
            let tags: BTreeMap<String, TagInfo> =
                parsed.into_iter().map(|(k, v)| (k, v.into())).collect();

            if serde_json::to_value(&tags)? != raw {
                info!("Migrating tag catalog {} to current format", path.display());
                write_atomic(&path, &tags).await?;
            }
            tags
        } else {
            info!("Creating default tag catalog at {}", path.display());
            write_atomic(&path, &defaults).await?;
            defaults
        };

        debug!("Loaded {} tags from {}", tags.len(), path.display());
        Ok(Self {
            path,
            tags: RwLock::new(tags),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, name: &str) -> Option<TagInfo> {
        self.tags.read().await.get(name).cloned()
    }

    /// Badge colour, falling back to [`DEFAULT_TAG_COLOR`] for dangling tags.
    pub async fn color_for(&self, name: &str) -> String {
        self.get(name)
            .await
            .map_or_else(default_color, |info| info.color)
    }

    /// Description, or empty when the tag is unknown.
    pub async fn description_for(&self, name: &str) -> String {
        self.get(name)
            .await
            .map(|info| info.description)
            .unwrap_or_default()
    }

    /// Sorted tag names.
    pub async fn names(&self) -> Vec<String> {
        self.tags.read().await.keys().cloned().collect()
    }

    pub async fn entries(&self) -> BTreeMap<String, TagInfo> {
        self.tags.read().await.clone()
    }

    /// Add or replace a tag and persist the catalog.
    pub async fn upsert(&self, name: &str, info: TagInfo) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("tag name is required".to_string()));
        }

        let mut tags = self.tags.write().await;
        let mut updated = tags.clone();
        updated.insert(name.to_string(), info);
        write_atomic(&self.path, &updated).await?;
        *tags = updated;

        info!("Saved tag {name}");
        Ok(())
    }

    /// Remove a tag. Entries carrying it keep the tag and render with the
    /// default colour. Returns whether anything was removed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut tags = self.tags.write().await;
        if !tags.contains_key(name) {
            return Ok(false);
        }

        let mut updated = tags.clone();
        updated.remove(name);
        write_atomic(&self.path, &updated).await?;
        *tags = updated;

        info!("Removed tag {name}");
        Ok(true)
    }
}

async fn write_atomic(path: &Path, tags: &BTreeMap<String, TagInfo>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(tags)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)
        .await
        .map_err(|e| StoreError::Catalog(format!("{}: {e}", temp_path.display())))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        warn!("Failed to replace {}: {e}", path.display());
        return Err(StoreError::Catalog(format!("{}: {e}", path.display())));
    }
    Ok(())
}
