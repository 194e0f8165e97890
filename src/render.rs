//! Frame hooks around the simulation.
//!
//! The generator calls a [`Renderer`] around every physics step so a
//! front end can show the scene as it settles. Nothing here feeds back into
//! the simulation.

use indicatif::{ProgressBar, ProgressStyle};

use crate::physics::PhysicsWorld;
use crate::scene::Scene;


pub trait Renderer {
    fn begin_frame(&mut self);
    fn draw(&mut self, world: &dyn PhysicsWorld);
    fn end_frame(&mut self);
    /// Called after the set of objects changed.
    fn sync_assets(&mut self, scene: &Scene);
    fn finish(&mut self) {}
}

/// Renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn begin_frame(&mut self) {}
    fn draw(&mut self, _world: &dyn PhysicsWorld) {}
    fn end_frame(&mut self) {}
    fn sync_assets(&mut self, _scene: &Scene) {}
}

/// Shows simulation progress as a terminal progress bar, one tick per frame.
pub struct ProgressRenderer {
    pb: ProgressBar,
}

impl ProgressRenderer {
    pub fn new(total_frames: u64) -> Self {
        let pb = ProgressBar::new(total_frames);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁");
        pb.set_style(style);
        pb.set_message("frames".to_string());
        Self { pb }
    }

    pub fn frames(&self) -> u64 {
        self.pb.position()
    }
}

impl Renderer for ProgressRenderer {
    fn begin_frame(&mut self) {}

    fn draw(&mut self, world: &dyn PhysicsWorld) {
        self.pb.set_message(format!("{} bodies", world.body_count()));
    }

    fn end_frame(&mut self) {
        self.pb.inc(1);
    }

    fn sync_assets(&mut self, scene: &Scene) {
        self.pb.println(format!("{} objects in scene", scene.moving_objects.len()));
    }

    fn finish(&mut self) {
        self.pb.finish_with_message("done");
    }
}
