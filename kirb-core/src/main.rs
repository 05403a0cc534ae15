//! Kirb headless runner
//!
//! Loads the level documents, plays a scripted run through the scene
//! director, then verifies determinism by replaying the first scene.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kirb::{
    TICK_RATE, VERSION,
    config::RuntimeConfig,
    game::{
        commands::Command,
        events::GameEventData,
        input::{InputFrame, PlayerInputBuffer},
        map::DirLevelSource,
        scene::{SceneCatalog, SceneDirector},
        tick::{tick, replay_ticks},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let runtime = RuntimeConfig::from_env();
    let config = runtime.game_config().context("loading game config")?;

    info!("Kirb core v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);
    info!("Levels: {}", runtime.level_dir.display());

    let source = DirLevelSource::new(runtime.level_dir.clone());
    let mut director = SceneDirector::new(source, SceneCatalog::default(), config, &runtime.start_scene)?;
    let loaded = director.preload().await?;
    info!("Preloaded {} level maps", loaded);

    director.enter(&runtime.start_scene).await?;
    demo_run(&mut director, runtime.max_ticks).await?;
    verify_determinism(&director, &runtime.start_scene, runtime.max_ticks)?;

    Ok(())
}

/// Scripted input: run right, hop now and then, inhale in bursts.
fn demo_input(t: u32) -> InputFrame {
    let mut frame = InputFrame::new();
    frame.set_right(t % 240 < 180);
    frame.set_left(t % 600 > 540);
    frame.set_jump(t % 75 == 0);
    frame.set_action((90..150).contains(&(t % 300)));
    frame
}

async fn demo_run(director: &mut SceneDirector<DirLevelSource>, max_ticks: u32) -> anyhow::Result<()> {
    info!("=== Starting Demo Run ({} ticks) ===", max_ticks);

    let mut total_events = 0;
    for t in 1..=max_ticks {
        let result = director.tick(&demo_input(t)).await?;
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                GameEventData::PlayerDamaged { health_left, .. } => {
                    info!("Tick {}: player hit, {} health left", t, health_left);
                }
                GameEventData::EnemyCaptured { enemy, .. } => info!("Tick {}: captured {:?}", t, enemy),
                GameEventData::EnemyDestroyed { enemy, cause } => {
                    info!("Tick {}: {:?} destroyed ({:?})", t, enemy, cause);
                }
                GameEventData::PlayerDied { .. } => info!("Tick {}: player died", t),
                _ => {}
            }
        }

        for command in &result.commands {
            if let Command::SwitchScene { scene } = command {
                info!("Tick {}: switched to {}", t, scene);
            }
        }

        if t % (10 * TICK_RATE) == 0 {
            if let Some(world) = director.world() {
                info!(
                    "Tick {}: scene {}, {} enemies, {} events so far",
                    t,
                    world.scene,
                    world.enemy_count(),
                    total_events
                );
            }
        }
    }

    info!("=== Demo Results ===");
    info!("Scene entries: {}", director.entries());
    info!("Total events: {}", total_events);
    if let Some(world) = director.world() {
        info!("Final scene {} at tick {}", world.scene, world.tick);
        info!("Final State Hash: {}", hex::encode(world.compute_hash()));
    }
    Ok(())
}

fn verify_determinism(
    director: &SceneDirector<DirLevelSource>,
    scene: &str,
    max_ticks: u32,
) -> anyhow::Result<()> {
    info!("=== Verifying Determinism ===");

    let mut live = director.build_world(scene)?;
    let mut recording = PlayerInputBuffer::new(scene, live.rng_seed);
    for t in 1..=max_ticks {
        let input = demo_input(t);
        recording.record(t, input);
        if tick(&mut live, &input).scene_request.is_some() {
            break;
        }
    }
    recording.finalize(live.tick);

    let hash = live.compute_hash();
    info!(
        "Recorded {} ticks in {} deltas (~{} bytes)",
        recording.tick_count(),
        recording.delta_count(),
        recording.estimated_size()
    );
    info!("Live State Hash: {}", hex::encode(hash));

    let mut replayed = director.build_world(scene)?;
    replay_ticks(&mut replayed, &recording);
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
    }
    Ok(())
}
