//! Scene Lifecycle
//!
//! [`SceneState`] tracks the active and successor scenes within a fixed
//! set of known names. [`SceneDirector`] owns the map cache and the
//! active [`World`], builds a fresh world on every scene entry and
//! turns the world's transition requests into scene switches.
//!
//! ## Entry
//!
//! ```text
//! enter(name) ─► validate name + successor ─► load map (cached)
//!             ─► build world from map ─► commit SceneState
//! ```
//!
//! Any failure before the commit leaves the previous scene and world
//! untouched.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::core::fixed::from_int;
use crate::game::commands::Command;
use crate::game::factory;
use crate::game::input::InputFrame;
use crate::game::map::{LevelSource, MapCache, MapParseError};
use crate::game::tick::{self, TickResult};
use crate::game::world::{SceneTarget, World};

// =============================================================================
// ERRORS
// =============================================================================

/// A scene name outside the known set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown scene '{name}'")]
pub struct UnknownSceneError {
    /// Rejected name
    pub name: String,
}

/// Scene entry failed.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Level map could not be loaded.
    #[error(transparent)]
    Map(#[from] MapParseError),

    /// Scene or successor name is not known.
    #[error(transparent)]
    UnknownScene(#[from] UnknownSceneError),

    /// Level has no player start.
    #[error("level '{level}' has no player spawn point")]
    MissingPlayerSpawn {
        /// Level identifier
        level: String,
    },

    /// Level map was never loaded into the cache.
    #[error("level '{level}' is not loaded")]
    MapNotLoaded {
        /// Level identifier
        level: String,
    },
}

// =============================================================================
// SCENE STATE
// =============================================================================

/// Active and successor scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneState {
    current: String,
    next: Option<String>,
    known: BTreeSet<String>,
}

impl SceneState {
    /// Create with the known scene set and the initial scene.
    pub fn new<I, N>(known: I, initial: &str) -> Result<Self, UnknownSceneError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let known: BTreeSet<String> = known.into_iter().map(Into::into).collect();
        if !known.contains(initial) {
            return Err(UnknownSceneError { name: initial.to_string() });
        }
        Ok(Self {
            current: initial.to_string(),
            next: None,
            known,
        })
    }

    /// Active scene.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Successor of the active scene; `None` for scenes without one.
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Whether `name` is a known scene.
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Set the active scene. Unknown names leave it unchanged.
    pub fn set_current_scene(&mut self, name: &str) -> Result<(), UnknownSceneError> {
        self.check(name)?;
        self.current = name.to_string();
        Ok(())
    }

    /// Set the successor scene. Unknown names leave it unchanged.
    pub fn set_next_scene(&mut self, name: &str) -> Result<(), UnknownSceneError> {
        self.check(name)?;
        self.next = Some(name.to_string());
        Ok(())
    }

    /// Forget the successor, for scenes that have none.
    pub fn clear_next_scene(&mut self) {
        self.next = None;
    }

    /// Scene name a transition request points at.
    pub fn resolve(&self, target: SceneTarget) -> Option<&str> {
        match target {
            SceneTarget::Current => Some(self.current()),
            SceneTarget::Next => self.next(),
        }
    }

    fn check(&self, name: &str) -> Result<(), UnknownSceneError> {
        if self.is_known(name) {
            Ok(())
        } else {
            warn!("Rejecting unknown scene '{}'", name);
            Err(UnknownSceneError { name: name.to_string() })
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// One scene definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDef {
    /// Scene name
    pub name: String,
    /// Level map instantiated on entry (None for an empty scene)
    #[serde(default)]
    pub map: Option<String>,
    /// Successor set on entry
    #[serde(default)]
    pub next: Option<String>,
    /// Camera follows the player while left of this x (world units)
    #[serde(default)]
    pub camera_limit: Option<i32>,
}

impl SceneDef {
    fn level(name: &str, next: &str, camera_limit: i32) -> Self {
        Self {
            name: name.to_string(),
            map: Some(name.to_string()),
            next: Some(next.to_string()),
            camera_limit: Some(camera_limit),
        }
    }
}

/// Every scene the game knows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneCatalog {
    /// Definitions in declaration order
    pub scenes: Vec<SceneDef>,
}

impl Default for SceneCatalog {
    fn default() -> Self {
        Self {
            scenes: vec![
                SceneDef::level("level-1", "level-2", 432),
                SceneDef::level("level-2", "level-1", 2100),
                SceneDef {
                    name: "end".to_string(),
                    map: None,
                    next: None,
                    camera_limit: None,
                },
            ],
        }
    }
}

impl SceneCatalog {
    /// Definition of a scene.
    pub fn get(&self, name: &str) -> Option<&SceneDef> {
        self.scenes.iter().find(|def| def.name == name)
    }

    /// Scene names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenes.iter().map(|def| def.name.as_str())
    }

    /// Distinct level maps referenced by any scene.
    pub fn maps(&self) -> BTreeSet<&str> {
        self.scenes.iter().filter_map(|def| def.map.as_deref()).collect()
    }
}

// =============================================================================
// DIRECTOR
// =============================================================================

/// Runs the active scene and performs scene switches.
pub struct SceneDirector<S> {
    source: S,
    cache: MapCache,
    catalog: SceneCatalog,
    state: SceneState,
    config: GameConfig,
    world: Option<World>,
    entries: u32,
}

impl<S: LevelSource> SceneDirector<S> {
    /// Create a director. No scene is active until [`enter`](Self::enter).
    pub fn new(
        source: S,
        catalog: SceneCatalog,
        config: GameConfig,
        initial: &str,
    ) -> Result<Self, UnknownSceneError> {
        let state = SceneState::new(catalog.names(), initial)?;
        for def in &catalog.scenes {
            if let Some(next) = &def.next {
                if !state.is_known(next) {
                    return Err(UnknownSceneError { name: next.clone() });
                }
            }
        }

        Ok(Self {
            source,
            cache: MapCache::new(),
            catalog,
            state,
            config,
            world: None,
            entries: 0,
        })
    }

    /// Load every map the catalog references. Returns how many are cached.
    pub async fn preload(&mut self) -> Result<usize, MapParseError> {
        let maps: Vec<String> = self.catalog.maps().into_iter().map(str::to_string).collect();
        for level in &maps {
            self.cache.load(&self.source, level).await?;
        }
        Ok(self.cache.len())
    }

    /// Build a fresh world for a scene from an already cached map.
    pub fn build_world(&self, name: &str) -> Result<World, SceneError> {
        let def = self
            .catalog
            .get(name)
            .ok_or_else(|| UnknownSceneError { name: name.to_string() })?;

        let mut world = World::new(name, self.config.clone());
        world.camera_limit = def.camera_limit.map(from_int);

        if let Some(level) = &def.map {
            let map = self
                .cache
                .get(level)
                .ok_or_else(|| SceneError::MapNotLoaded { level: level.clone() })?;
            factory::populate_level(&mut world, &map)?;
        }
        Ok(world)
    }

    /// Activate a scene, replacing the current world.
    pub async fn enter(&mut self, name: &str) -> Result<&mut World, SceneError> {
        let def = self
            .catalog
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownSceneError { name: name.to_string() })?;
        if let Some(next) = &def.next {
            if !self.state.is_known(next) {
                return Err(UnknownSceneError { name: next.clone() }.into());
            }
        }

        if let Some(level) = &def.map {
            self.cache.load(&self.source, level).await?;
        }
        let world = self.build_world(name)?;

        self.state.set_current_scene(name)?;
        match &def.next {
            Some(next) => self.state.set_next_scene(next)?,
            None => self.state.clear_next_scene(),
        }
        self.entries += 1;

        info!(
            "Entered scene {} (next: {}, {} entities)",
            name,
            self.state.next().unwrap_or("-"),
            world.entities.len()
        );
        Ok(self.world.insert(world))
    }

    /// Tick the active world and perform any transition it requests.
    ///
    /// A switch shows up as a trailing [`Command::SwitchScene`].
    pub async fn tick(&mut self, input: &InputFrame) -> Result<TickResult, SceneError> {
        let Some(world) = self.world.as_mut() else {
            warn!("Tick with no active scene");
            return Ok(TickResult::default());
        };

        let mut result = tick::tick(world, input);
        let Some(request) = world.take_scene_request() else {
            return Ok(result);
        };

        match self.state.resolve(request.target).map(str::to_string) {
            Some(target) => {
                info!(
                    "Leaving {} for {} ({:?})",
                    self.state.current(),
                    target,
                    request.reason
                );
                self.enter(&target).await?;
                result.commands.push(Command::SwitchScene { scene: target });
            }
            None => warn!(
                "No {:?} scene to switch to from {}",
                request.target,
                self.state.current()
            ),
        }
        Ok(result)
    }

    /// Scene bookkeeping.
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Scene definitions.
    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    /// Loaded maps.
    pub fn cache(&self) -> &MapCache {
        &self.cache
    }

    /// Level source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Active world.
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Active world, mutably.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }

    /// Number of successful scene entries.
    pub fn entries(&self) -> u32 {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Tag;
    use crate::game::map::MemoryLevelSource;
    use serde_json::json;

    fn known() -> SceneState {
        SceneState::new(["level-1", "level-2", "end"], "level-1").unwrap()
    }

    fn level_doc(with_exit: bool) -> String {
        let mut colliders = vec![json!({ "name": "", "x": 0, "y": 100, "width": 500, "height": 20 })];
        if with_exit {
            colliders.push(json!({ "name": "exit", "x": 0, "y": 60, "width": 40, "height": 40 }));
        }
        json!({
            "layers": [
                { "name": "colliders", "objects": colliders },
                { "name": "spawnpoints", "objects": [
                    { "name": "player", "x": 10, "y": 80 },
                    { "name": "flame", "x": 200, "y": 80 }
                ]}
            ]
        })
        .to_string()
    }

    fn source() -> MemoryLevelSource {
        MemoryLevelSource::new()
            .with_level("level-1", level_doc(false))
            .with_level("level-2", level_doc(false))
    }

    fn director(source: MemoryLevelSource) -> SceneDirector<MemoryLevelSource> {
        SceneDirector::new(source, SceneCatalog::default(), GameConfig::default(), "level-1").unwrap()
    }

    #[test]
    fn test_unknown_next_scene_rejected() {
        let mut state = known();
        state.set_next_scene("level-2").unwrap();

        let err = state.set_next_scene("level-9").unwrap_err();
        assert_eq!(err, UnknownSceneError { name: "level-9".to_string() });
        assert_eq!(state.next(), Some("level-2"));

        assert!(state.set_current_scene("level-9").is_err());
        assert_eq!(state.current(), "level-1");
    }

    #[test]
    fn test_resolve_targets() {
        let mut state = known();
        assert_eq!(state.resolve(SceneTarget::Current), Some("level-1"));
        assert_eq!(state.resolve(SceneTarget::Next), None);

        state.set_next_scene("end").unwrap();
        assert_eq!(state.resolve(SceneTarget::Next), Some("end"));
    }

    #[test]
    fn test_initial_scene_must_be_known() {
        assert!(SceneState::new(["level-1"], "level-3").is_err());
    }

    #[test]
    fn test_default_catalog() {
        let catalog = SceneCatalog::default();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["level-1", "level-2", "end"]);
        assert_eq!(catalog.maps().len(), 2);
        assert_eq!(catalog.get("level-2").unwrap().next.as_deref(), Some("level-1"));
        assert!(catalog.get("end").unwrap().map.is_none());
    }

    #[test]
    fn test_catalog_with_dangling_successor_rejected() {
        let mut catalog = SceneCatalog::default();
        catalog.scenes[0].next = Some("level-9".to_string());
        let result = SceneDirector::new(source(), catalog, GameConfig::default(), "level-1");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_enter_sets_scene_state() {
        let mut director = director(source());
        let world = director.enter("level-1").await.unwrap();
        assert_eq!(world.scene, "level-1");
        assert!(world.player_id.is_some());
        assert_eq!(world.camera_limit, Some(from_int(432)));

        assert_eq!(director.state().current(), "level-1");
        assert_eq!(director.state().next(), Some("level-2"));
    }

    #[tokio::test]
    async fn test_enter_unknown_scene() {
        let mut director = director(source());
        let err = director.enter("level-9").await.unwrap_err();
        assert!(matches!(err, SceneError::UnknownScene(_)));
        assert!(director.world().is_none());
    }

    #[tokio::test]
    async fn test_reentry_never_refetches() {
        let mut director = director(source());
        assert_eq!(director.preload().await.unwrap(), 2);
        assert_eq!(director.source().fetch_count(), 2);

        director.enter("level-1").await.unwrap();
        director.enter("level-2").await.unwrap();
        director.enter("level-1").await.unwrap();

        assert_eq!(director.source().fetch_count(), 2);
        assert_eq!(director.entries(), 3);
    }

    #[tokio::test]
    async fn test_failed_map_keeps_previous_scene() {
        let source = MemoryLevelSource::new().with_level("level-1", level_doc(false));
        let mut director = director(source);
        director.enter("level-1").await.unwrap();

        let err = director.enter("level-2").await.unwrap_err();
        assert!(matches!(err, SceneError::Map(MapParseError::Fetch { .. })));
        assert_eq!(director.state().current(), "level-1");
        assert_eq!(director.world().unwrap().scene, "level-1");
        assert!(!director.cache().contains("level-2"));
    }

    #[tokio::test]
    async fn test_exit_switches_to_next_scene() {
        let source = MemoryLevelSource::new()
            .with_level("level-1", level_doc(true))
            .with_level("level-2", level_doc(false));
        let mut director = director(source);
        director.enter("level-1").await.unwrap();

        let result = director.tick(&InputFrame::new()).await.unwrap();
        assert_eq!(
            result.commands.last(),
            Some(&Command::SwitchScene { scene: "level-2".to_string() })
        );
        assert_eq!(director.state().current(), "level-2");
        assert_eq!(director.state().next(), Some("level-1"));

        let world = director.world().unwrap();
        assert_eq!(world.scene, "level-2");
        assert_eq!(world.tick, 0);
        assert!(world.scene_request().is_none());
    }

    #[tokio::test]
    async fn test_death_restarts_current_scene() {
        let mut director = director(source());
        director.enter("level-1").await.unwrap();

        if let Some(world) = director.world_mut() {
            let player = world.player_id.unwrap();
            world.get_mut(player).unwrap().position.y = from_int(2500);
        }
        let result = director.tick(&InputFrame::new()).await.unwrap();

        assert_eq!(
            result.commands.last(),
            Some(&Command::SwitchScene { scene: "level-1".to_string() })
        );
        assert_eq!(director.entries(), 2);
        let world = director.world().unwrap();
        assert_eq!(world.player().unwrap().as_player().unwrap().health, 3);
        assert_eq!(world.ids_with_tag(Tag::Enemy).len(), 1);
    }

    #[tokio::test]
    async fn test_end_scene_is_empty() {
        let mut director = director(source());
        let world = director.enter("end").await.unwrap();
        assert!(world.entities.is_empty());
        assert_eq!(director.state().next(), None);

        let result = director.tick(&InputFrame::new()).await.unwrap();
        assert!(result.commands.is_empty());
    }

    #[tokio::test]
    async fn test_end_scene_clears_previous_successor() {
        let mut director = director(source());
        director.enter("level-1").await.unwrap();
        assert_eq!(director.state().next(), Some("level-2"));

        director.enter("end").await.unwrap();
        assert_eq!(director.state().current(), "end");
        assert_eq!(director.state().next(), None);
        assert_eq!(director.state().resolve(SceneTarget::Next), None);
    }
}
