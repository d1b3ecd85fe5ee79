//! Scene group catalog
//!
//! Static mapping from a scene-group identifier to the ordered scenes that
//! make up the group. Built once from configuration and never mutated.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::CatalogConfig;

/// Scene-group identifier (`"App"`, `"MainMenu"`, `"Gameplay"`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneGroupId(String);

impl SceneGroupId {
    /// Create an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneGroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reference to one loadable scene by path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneRef {
    path: String,
}

impl SceneRef {
    /// Create a scene reference
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Scene path as understood by the backend
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for SceneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Catalog construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The same group identifier appears twice
    #[error("Scene group '{0}' is defined more than once")]
    DuplicateGroup(SceneGroupId),

    /// A scene path is blank
    #[error("Scene group '{group}' has an empty scene path at position {index}")]
    EmptyScenePath {
        /// Group containing the blank entry
        group: SceneGroupId,
        /// Position of the blank entry
        index: usize,
    },

    /// No transition scene configured
    #[error("Transition scene path is empty")]
    EmptyTransitionScene,
}

/// Immutable group → scenes lookup
#[derive(Debug, Clone)]
pub struct SceneGroupCatalog {
    groups: HashMap<SceneGroupId, Vec<SceneRef>>,
    transition_scene: SceneRef,
}

impl SceneGroupCatalog {
    /// Build the catalog from configuration
    pub fn build(config: &CatalogConfig) -> Result<Self, CatalogError> {
        if config.transition_scene.trim().is_empty() {
            return Err(CatalogError::EmptyTransitionScene);
        }

        let mut groups = HashMap::with_capacity(config.groups.len());
        for entry in &config.groups {
            if groups.contains_key(&entry.id) {
                return Err(CatalogError::DuplicateGroup(entry.id.clone()));
            }

            let mut scenes = Vec::with_capacity(entry.scenes.len());
            for (index, path) in entry.scenes.iter().enumerate() {
                if path.trim().is_empty() {
                    return Err(CatalogError::EmptyScenePath { group: entry.id.clone(), index });
                }
                scenes.push(SceneRef::new(path.as_str()));
            }
            if scenes.is_empty() {
                log::warn!("Scene group '{}' has no scenes", entry.id);
            }

            groups.insert(entry.id.clone(), scenes);
        }

        log::info!("Scene catalog built with {} groups", groups.len());
        Ok(Self {
            groups,
            transition_scene: SceneRef::new(config.transition_scene.as_str()),
        })
    }

    /// Scenes of a group, in load order
    pub fn resolve(&self, group: &SceneGroupId) -> Option<&[SceneRef]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Scene used as the loading indicator
    pub fn transition_scene(&self) -> &SceneRef {
        &self.transition_scene
    }

    /// All known group identifiers, sorted
    pub fn group_ids(&self) -> Vec<&SceneGroupId> {
        let mut ids: Vec<_> = self.groups.keys().collect();
        ids.sort();
        ids
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups are defined
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
