//! Application trait and lifecycle management

use crate::context::{BaseContext, ContextError};
use crate::pool::{PoolKind, Poolable};
use crate::scene::SceneBackend;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive a `BaseContext` from a host loop.
pub trait Application: Sized {
    /// Pool key type
    type Kind: PoolKind;
    /// Pooled object type
    type Object: Poolable;
    /// Scene engine
    type Backend: SceneBackend;

    /// Initialize the application
    ///
    /// Called once before the context is started. Register pool kinds and
    /// scene event handlers here.
    fn initialize(&mut self, context: &mut AppContext<Self>) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every frame after the context has ticked.
    ///
    /// # Arguments
    /// * `context` - Mutable reference to the context
    /// * `delta_time` - Time since last frame in seconds
    fn update(&mut self, context: &mut AppContext<Self>, delta_time: f32) -> Result<(), AppError>;

    /// Cleanup the application
    ///
    /// Called once when the loop ends, on error too, before the context is
    /// torn down.
    fn cleanup(&mut self, context: &mut AppContext<Self>);
}

/// Context type an application runs against
pub type AppContext<A> =
    BaseContext<<A as Application>::Kind, <A as Application>::Object, <A as Application>::Backend>;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Context error propagated to application level
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),

    /// Game logic error
    #[error("Game logic error: {0}")]
    GameLogic(String),
}

/// Run `app` on a fixed frame time until it requests exit
///
/// `max_frames` bounds headless runs. Returns the number of frames run.
/// Context teardown happens on every exit path; `cleanup` runs once
/// `initialize` has succeeded.
pub fn run_fixed<A: Application>(
    context: &mut AppContext<A>,
    app: &mut A,
    delta_time: f32,
    max_frames: u64,
) -> Result<u64, AppError> {
    if let Err(err) = app.initialize(context) {
        context.teardown();
        return Err(err);
    }
    let result = run_frames(context, app, delta_time, max_frames);
    app.cleanup(context);
    context.teardown();
    result
}

fn run_frames<A: Application>(
    context: &mut AppContext<A>,
    app: &mut A,
    delta_time: f32,
    max_frames: u64,
) -> Result<u64, AppError> {
    log::info!("Starting main loop...");
    let mut frames = 0;
    while frames < max_frames && !context.exit_requested() {
        context.update(delta_time)?;
        app.update(context, delta_time)?;
        frames += 1;
    }
    if frames == max_frames {
        log::warn!("Main loop stopped at frame limit {}", max_frames);
    }
    Ok(frames)
}
