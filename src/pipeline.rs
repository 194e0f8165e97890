//! The full generation schedule.
//!
//! **Context**: objects dropped at random positions interpenetrate, fall
//! through each other and keep bouncing. The scene is only usable once the
//! physics has settled it and the overlapping leftovers have been cleaned out.
//!
//! **How it Works**: the layout walls are held back while objects settle so
//! they cannot wedge against them. Large objects go in first and get several
//! simulate/remediate cycles, then small objects are dropped on top of them
//! and get the same treatment. Finally the layout is inserted, the scene is
//! given one last short settle, and every object at rest is exported.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::Rng;

use crate::library::Library;
use crate::output::{collect_records, write_scene_file, ExportRecord};
use crate::physics::PhysicsWorld;
use crate::remediation::{remediate, RemediationReport};
use crate::render::Renderer;
use crate::scene::Scene;
use crate::settings::Settings;


/// Counts gathered over one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSummary {
    pub large_placed: usize,
    pub small_placed: usize,
    /// Number of remediation passes.
    pub passes: usize,
    pub removed: usize,
    pub nudged: usize,
    pub exported: usize,
    pub output: PathBuf,
}

impl GenerationSummary {
    fn record(&mut self, report: &RemediationReport) {
        self.passes += 1;
        self.removed += report.removed;
        self.nudged += report.nudged;
    }
}

#[derive(Debug)]
pub struct Generation {
    pub scene: Scene,
    pub records: Vec<ExportRecord>,
    pub summary: GenerationSummary,
}

pub struct Generator {
    pub settings: Settings,
}

impl Generator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Number of whole physics steps that fit in `duration` seconds.
    pub fn frames(&self, duration: f32) -> u64 {
        (duration / self.settings.timestep).trunc().max(0.0) as u64
    }

    /// Number of physics steps in a full run.
    pub fn total_frames(&self) -> u64 {
        let s = &self.settings;
        let cycles = s.settle_cycles as u64;
        self.frames(s.settle_duration) * cycles
            + self.frames(s.drop_duration)
            + self.frames(s.settle_duration) * cycles.saturating_sub(1)
            + 1
            + self.frames(s.final_duration)
    }

    /// Builds one scene and writes it to the configured output.
    pub fn run<R: Rng + ?Sized>(
        &self,
        world: &mut dyn PhysicsWorld,
        renderer: &mut dyn Renderer,
        rng: &mut R,
    ) -> Result<Generation> {
        let s = &self.settings;
        let layouts = Library::load(&s.scene_root, &s.scene_description, s.scene_probability.as_deref(), None)
            .context("failed to load the scene layout library")?;
        let library = Library::load(
            &s.library_root,
            &s.library_description,
            s.large_probability.as_deref(),
            s.small_probability.as_deref(),
        )
        .context("failed to load the object library")?;

        let mut summary = GenerationSummary::default();
        let mut scene = Scene::add_layout(&layouts, rng, false, world).context("failed to place the layout")?;
        if s.ground {
            scene.add_ground(world)?;
        }
        renderer.sync_assets(&scene);

        let area = scene.scene_area();
        let max_large = object_budget(area, s.large_density);
        summary.large_placed = scene.add_large_objects(&library, rng, max_large, world)?;
        renderer.sync_assets(&scene);
        for _ in 0..s.settle_cycles {
            self.settle(&mut scene, world, renderer, s.settle_duration, &mut summary);
        }

        let max_small = object_budget(area, s.small_density);
        summary.small_placed = scene.add_small_objects(&library, rng, max_small, s.place_on_large, world)?;
        renderer.sync_assets(&scene);
        self.settle(&mut scene, world, renderer, s.drop_duration, &mut summary);
        for _ in 1..s.settle_cycles {
            self.settle(&mut scene, world, renderer, s.settle_duration, &mut summary);
        }

        scene.insert_layout(world)?;
        self.simulate_frames(world, renderer, 1);
        let report = remediate(&mut scene, world);
        summary.record(&report);
        renderer.sync_assets(&scene);
        self.simulate(world, renderer, s.final_duration);
        renderer.finish();

        let records = collect_records(&scene, world);
        summary.exported = records.len();
        summary.output = s.output_path();
        write_scene_file(&summary.output, &scene.layout.mesh_path, &records)
            .with_context(|| format!("failed to write {}", summary.output.display()))?;

        log::info!(
            "placed {} large and {} small objects, removed {}, nudged {} over {} passes, exported {} to {}",
            summary.large_placed,
            summary.small_placed,
            summary.removed,
            summary.nudged,
            summary.passes,
            summary.exported,
            summary.output.display()
        );

        Ok(Generation {
            scene,
            records,
            summary,
        })
    }

    /// One simulate-then-remediate cycle.
    fn settle(
        &self,
        scene: &mut Scene,
        world: &mut dyn PhysicsWorld,
        renderer: &mut dyn Renderer,
        duration: f32,
        summary: &mut GenerationSummary,
    ) {
        self.simulate(world, renderer, duration);
        let report = remediate(scene, world);
        summary.record(&report);
        renderer.sync_assets(scene);
    }

    fn simulate(&self, world: &mut dyn PhysicsWorld, renderer: &mut dyn Renderer, duration: f32) {
        self.simulate_frames(world, renderer, self.frames(duration));
    }

    fn simulate_frames(&self, world: &mut dyn PhysicsWorld, renderer: &mut dyn Renderer, frames: u64) {
        for _ in 0..frames {
            renderer.begin_frame();
            world.step(self.settings.timestep);
            renderer.draw(world);
            renderer.end_frame();
        }
    }
}

/// Upper bound on objects in one pass. The area is cut to whole square
/// units before the density applies.
pub fn object_budget(area: f32, density: f32) -> usize {
    (area.trunc() * density).max(0.0) as usize
}
