//! Headless scene-loading demo
//!
//! Boots the App group, opens the main menu, then enters gameplay behind
//! the loading scene while logging smoothed progress. Gameplay spawns a
//! wave of pooled coins and returns them before exiting.
//!
//! Usage: `loader_demo [config.toml|config.ron]`

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use unibase::foundation::logging;
use unibase::prelude::*;

const FRAME_TIME: f32 = 1.0 / 60.0;
const MAX_FRAMES: u64 = 60 * 60;
const WAVE_SIZE: usize = 12;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Failed to load config: {0}")]
    Config(#[from] unibase::core::ConfigError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Spawn {
    Coin,
}

impl PoolKind for Spawn {}

struct Coin {
    value: u32,
}

impl Poolable for Coin {
    fn on_show(&mut self, transition: Transition) {
        log::trace!("Coin worth {} fading in over {:.2}s", self.value, transition.total());
    }

    fn on_destroy(&mut self) {
        log::trace!("Coin worth {} destroyed", self.value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Booting,
    InMenu,
    EnteringGameplay,
    Playing,
    Collecting,
}

struct LoaderDemo {
    stage: Stage,
    menu_time: f32,
    coins: Vec<InstanceId>,
    collected: Rc<RefCell<bool>>,
}

impl LoaderDemo {
    fn new() -> Self {
        Self { stage: Stage::Booting, menu_time: 0.0, coins: Vec::new(), collected: Rc::new(RefCell::new(false)) }
    }

    fn enter(&mut self, stage: Stage) {
        log::info!("Demo stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

impl Application for LoaderDemo {
    type Kind = Spawn;
    type Object = Coin;
    type Backend = SimulatedBackend;

    fn initialize(&mut self, context: &mut AppContext<Self>) -> Result<(), AppError> {
        let mut next_value = 0;
        context.register_pool(Spawn::Coin, move |_| {
            next_value += 5;
            Coin { value: next_value }
        });

        context.scenes_mut().events_mut().register_for_all(|| {
            |event: &SceneEvent| {
                match event {
                    SceneEvent::TransitionStarted { group, .. } => log::info!("Loading '{}'", group),
                    SceneEvent::ProgressChanged { ratio, .. } => log::info!("Progress {:>5.1}%", ratio * 100.0),
                    SceneEvent::TransitionCompleted { group, .. } => log::info!("'{}' is ready", group),
                    SceneEvent::TransitionFailed { group, error, .. } => {
                        log::error!("Loading '{}' failed: {}", group, error);
                    }
                }
                false
            }
        });

        context.start(Some(&SceneGroupId::new("App")))?;
        Ok(())
    }

    fn update(&mut self, context: &mut AppContext<Self>, delta_time: f32) -> Result<(), AppError> {
        if !context.scenes().is_idle() {
            return Ok(());
        }
        if let Some(outcome) = context.scenes().last_outcome() {
            if !outcome.is_completed() {
                return Err(AppError::GameLogic(format!("scene transition ended as {outcome:?}")));
            }
        }

        match self.stage {
            Stage::Booting => {
                context.transition_to(&"MainMenu".into(), TransitionFlags::empty())?;
                self.enter(Stage::InMenu);
            }
            Stage::InMenu => {
                self.menu_time += delta_time;
                if self.menu_time >= 0.5 {
                    context.transition_to(&"Gameplay".into(), TransitionFlags::USE_LOADING_SCENE)?;
                    self.enter(Stage::EnteringGameplay);
                }
            }
            Stage::EnteringGameplay => {
                let pools = context.pools_mut();
                for index in 0..WAVE_SIZE {
                    let delay = index as f32 * 0.05;
                    if let Some(id) = pools.acquire(Spawn::Coin, true, Transition::new(0.2, delay), Completion::none()) {
                        self.coins.push(id);
                    }
                }
                log::info!("Spawned {} coins", self.coins.len());
                self.enter(Stage::Playing);
            }
            Stage::Playing => {
                let pools = context.pools();
                if self.coins.iter().all(|&id| pools.state(id) == Some(InstanceState::Active)) {
                    let collected = Rc::clone(&self.collected);
                    context.pools_mut().release_all_of_kind(
                        &Spawn::Coin,
                        Transition::new(0.3, 0.0),
                        Completion::new(move || *collected.borrow_mut() = true),
                    );
                    self.enter(Stage::Collecting);
                }
            }
            Stage::Collecting => {
                if *self.collected.borrow() {
                    if let Some(stats) = context.pools().stats(&Spawn::Coin) {
                        log::info!(
                            "Coins: created {}, acquired {}, released {}, high water {}",
                            stats.created,
                            stats.acquired,
                            stats.released,
                            stats.high_water
                        );
                    }
                    context.request_exit();
                }
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, context: &mut AppContext<Self>) {
        log::info!("Demo finished in stage {:?} after {:.2}s", self.stage, context.timer().total_time());
    }
}

fn load_config() -> Result<BaseConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(BaseConfig::load_from_file(path)?),
        None => Ok(BaseConfig::default()),
    }
}

fn backend_for(config: &BaseConfig) -> SimulatedBackend {
    let mut backend = SimulatedBackend::new()
        .with_unload_duration(0.1)
        .with_activation_duration(0.15);
    backend.add_scene(config.catalog.transition_scene.clone(), 0.2);
    for (index, group) in config.catalog.groups.iter().enumerate() {
        for scene in &group.scenes {
            backend.add_scene(scene.clone(), 0.4 + 0.3 * index as f32);
        }
    }
    backend
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);

    let backend = backend_for(&config);
    let mut context: AppContext<LoaderDemo> = BaseContext::create(config, backend)?;
    let mut demo = LoaderDemo::new();

    let frames = run_fixed(&mut context, &mut demo, FRAME_TIME, MAX_FRAMES)?;
    log::info!("Ran {} frames", frames);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        // Logging may not be up yet if the config failed to load
        eprintln!("loader_demo: {err}");
        std::process::exit(1);
    }
}
