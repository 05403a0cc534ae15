//! Tile Map Loading
//!
//! Turns a Tiled-style level document into static collider geometry
//! and a spawn-point registry. Two object layers are recognized:
//!
//! - `colliders`: every object becomes a [`ColliderSpec`]; an object
//!   named `exit` is a trigger, everything else a solid platform.
//! - `spawnpoints`: every object is appended to the registry group
//!   named after it, in document order.
//!
//! All other layers are ignored. Coordinates stay in level space here;
//! the entity factory applies the map scale.
//!
//! Maps are fetched through a [`LevelSource`] and kept in a [`MapCache`]
//! for the lifetime of the process, so re-entering a level never
//! fetches again.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::fixed::{to_fixed, Fixed};
use crate::core::vec2::FixedVec2;

/// Layer holding collision geometry.
pub const COLLIDER_LAYER: &str = "colliders";

/// Layer holding spawn points.
pub const SPAWN_LAYER: &str = "spawnpoints";

/// Collider object name marking the level exit.
pub const EXIT_OBJECT: &str = "exit";

/// Largest accepted level coordinate. Leaves room for the map scale
/// inside the Q16.16 range.
const MAX_LEVEL_COORD: f64 = 8000.0;

// =============================================================================
// ERRORS
// =============================================================================

/// Level could not be turned into a [`TileMap`].
#[derive(Debug, Error)]
pub enum MapParseError {
    /// The source could not deliver the document.
    #[error("failed to fetch level '{level}': {details}")]
    Fetch {
        /// Level identifier
        level: String,
        /// Underlying failure
        details: String,
    },

    /// The document is not a valid level description.
    #[error("level '{level}' is malformed: {source}")]
    Malformed {
        /// Level identifier
        level: String,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// An object carries unusable geometry.
    #[error("object '{name}' in layer '{layer}' of level '{level}' has invalid geometry")]
    InvalidObject {
        /// Level identifier
        level: String,
        /// Layer name
        layer: String,
        /// Object name
        name: String,
    },
}

// =============================================================================
// DOCUMENT FORMAT
// =============================================================================

/// Raw level document (the subset of Tiled JSON we read).
#[derive(Clone, Debug, Deserialize)]
pub struct LevelDocument {
    /// Layers in document order
    pub layers: Vec<LevelLayer>,
}

/// One layer of the document. Tile layers have no objects.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelLayer {
    /// Layer name
    pub name: String,
    /// Objects in document order
    #[serde(default)]
    pub objects: Vec<LevelObject>,
}

/// One object of an object layer.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelObject {
    /// Object name (spawn group or `exit`)
    #[serde(default)]
    pub name: String,
    /// Left edge / spawn x
    pub x: f64,
    /// Top edge / spawn y
    pub y: f64,
    /// Width (colliders only)
    #[serde(default)]
    pub width: f64,
    /// Height (colliders only)
    #[serde(default)]
    pub height: f64,
}

// =============================================================================
// PARSED MAP
// =============================================================================

/// What a collider does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderKind {
    /// Solid static body
    Platform,
    /// Trigger only, no body
    Exit,
}

/// Collider rectangle in level space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderSpec {
    /// Left edge
    pub x: Fixed,
    /// Top edge
    pub y: Fixed,
    /// Width
    pub width: Fixed,
    /// Height
    pub height: Fixed,
    /// Platform or exit
    pub kind: ColliderKind,
}

/// Spawn location in level space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// X position
    pub x: Fixed,
    /// Y position
    pub y: Fixed,
}

impl SpawnPoint {
    /// Position as a vector.
    pub fn position(&self) -> FixedVec2 {
        FixedVec2::new(self.x, self.y)
    }
}

/// Spawn groups keyed by object name.
///
/// Points keep declaration order; duplicates append.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRegistry {
    groups: BTreeMap<String, Vec<SpawnPoint>>,
}

impl SpawnRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point to a group.
    pub fn push(&mut self, name: &str, point: SpawnPoint) {
        self.groups.entry(name.to_string()).or_default().push(point);
    }

    /// Points of a group (empty if absent).
    pub fn get(&self, name: &str) -> &[SpawnPoint] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First point of a group.
    pub fn first(&self, name: &str) -> Option<SpawnPoint> {
        self.get(name).first().copied()
    }

    /// Group names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Total number of points.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// No points at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parsed level. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    /// Level identifier
    pub level: String,
    /// Colliders in document order
    pub colliders: Vec<ColliderSpec>,
    /// Spawn points
    pub spawns: SpawnRegistry,
}

impl TileMap {
    /// Number of exit colliders.
    pub fn exit_count(&self) -> usize {
        self.colliders
            .iter()
            .filter(|c| c.kind == ColliderKind::Exit)
            .count()
    }

    /// Bounding box of all geometry and spawns in level space,
    /// as (top-left, bottom-right).
    pub fn bounds(&self) -> Option<(FixedVec2, FixedVec2)> {
        let corners = self
            .colliders
            .iter()
            .flat_map(|c| {
                [
                    FixedVec2::new(c.x, c.y),
                    FixedVec2::new(c.x + c.width, c.y + c.height),
                ]
            })
            .chain(
                self.spawns
                    .groups
                    .values()
                    .flatten()
                    .map(SpawnPoint::position),
            );

        corners.fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((min, max)) => Some((
                FixedVec2::new(min.x.min(p.x), min.y.min(p.y)),
                FixedVec2::new(max.x.max(p.x), max.y.max(p.y)),
            )),
        })
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a raw level document.
pub fn parse_level(level: &str, raw: &str) -> Result<TileMap, MapParseError> {
    let document: LevelDocument =
        serde_json::from_str(raw).map_err(|source| MapParseError::Malformed {
            level: level.to_string(),
            source,
        })?;
    build_tile_map(level, &document)
}

/// Build a [`TileMap`] from an already-deserialized document.
pub fn build_tile_map(level: &str, document: &LevelDocument) -> Result<TileMap, MapParseError> {
    let mut colliders = Vec::new();
    let mut spawns = SpawnRegistry::new();

    for layer in &document.layers {
        match layer.name.as_str() {
            COLLIDER_LAYER => {
                for object in &layer.objects {
                    let invalid = || invalid_object(level, layer, object);
                    let kind = if object.name == EXIT_OBJECT {
                        ColliderKind::Exit
                    } else {
                        ColliderKind::Platform
                    };
                    if object.width < 0.0 || object.height < 0.0 {
                        return Err(invalid());
                    }
                    colliders.push(ColliderSpec {
                        x: level_coord(object.x).ok_or_else(invalid)?,
                        y: level_coord(object.y).ok_or_else(invalid)?,
                        width: level_coord(object.width).ok_or_else(invalid)?,
                        height: level_coord(object.height).ok_or_else(invalid)?,
                        kind,
                    });
                }
            }
            SPAWN_LAYER => {
                for object in &layer.objects {
                    let invalid = || invalid_object(level, layer, object);
                    let point = SpawnPoint {
                        x: level_coord(object.x).ok_or_else(invalid)?,
                        y: level_coord(object.y).ok_or_else(invalid)?,
                    };
                    spawns.push(&object.name, point);
                }
            }
            other => debug!("Level {}: ignoring layer '{}'", level, other),
        }
    }

    Ok(TileMap {
        level: level.to_string(),
        colliders,
        spawns,
    })
}

fn level_coord(value: f64) -> Option<Fixed> {
    if value.is_finite() && value.abs() <= MAX_LEVEL_COORD {
        Some(to_fixed(value))
    } else {
        None
    }
}

fn invalid_object(level: &str, layer: &LevelLayer, object: &LevelObject) -> MapParseError {
    MapParseError::InvalidObject {
        level: level.to_string(),
        layer: layer.name.clone(),
        name: object.name.clone(),
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// Where raw level documents come from.
pub trait LevelSource {
    /// Fetch the raw document for `level`.
    fn fetch(&self, level: &str) -> impl Future<Output = Result<String, MapParseError>> + Send;
}

/// Reads `<root>/<level>.json` from disk.
#[derive(Clone, Debug)]
pub struct DirLevelSource {
    root: PathBuf,
}

impl DirLevelSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a level is read from.
    pub fn path_for(&self, level: &str) -> PathBuf {
        self.root.join(format!("{level}.json"))
    }
}

impl LevelSource for DirLevelSource {
    fn fetch(&self, level: &str) -> impl Future<Output = Result<String, MapParseError>> + Send {
        let path = self.path_for(level);
        let level = level.to_string();
        async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| MapParseError::Fetch {
                    details: format!("{}: {}", path.display(), e),
                    level,
                })
        }
    }
}

/// In-memory documents. Counts fetches so callers can observe caching.
#[derive(Debug, Default)]
pub struct MemoryLevelSource {
    documents: BTreeMap<String, String>,
    fetches: AtomicUsize,
}

impl MemoryLevelSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a document.
    pub fn with_level(mut self, level: &str, raw: impl Into<String>) -> Self {
        self.documents.insert(level.to_string(), raw.into());
        self
    }

    /// Number of fetches served (including failures).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl LevelSource for MemoryLevelSource {
    fn fetch(&self, level: &str) -> impl Future<Output = Result<String, MapParseError>> + Send {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let result = self
            .documents
            .get(level)
            .cloned()
            .ok_or_else(|| MapParseError::Fetch {
                level: level.to_string(),
                details: "no such document".to_string(),
            });
        async move { result }
    }
}

// =============================================================================
// CACHE
// =============================================================================

/// Parsed maps shared read-only by every scene that uses them.
#[derive(Debug, Default)]
pub struct MapCache {
    maps: BTreeMap<String, Arc<TileMap>>,
}

impl MapCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached map, fetching and parsing it on first use.
    ///
    /// Failures are not cached; the next call retries.
    pub async fn load<S: LevelSource>(
        &mut self,
        source: &S,
        level: &str,
    ) -> Result<Arc<TileMap>, MapParseError> {
        if let Some(map) = self.maps.get(level) {
            return Ok(Arc::clone(map));
        }

        let raw = source.fetch(level).await?;
        let map = Arc::new(parse_level(level, &raw)?);

        info!(
            "Loaded level {}: {} colliders ({} exits), {} spawn points",
            level,
            map.colliders.len(),
            map.exit_count(),
            map.spawns.len()
        );

        self.maps.insert(level.to_string(), Arc::clone(&map));
        Ok(map)
    }

    /// Cached map, if loaded.
    pub fn get(&self, level: &str) -> Option<Arc<TileMap>> {
        self.maps.get(level).cloned()
    }

    /// Whether a level is cached.
    pub fn contains(&self, level: &str) -> bool {
        self.maps.contains_key(level)
    }

    /// Number of cached levels.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Nothing cached yet.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
