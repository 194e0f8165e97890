use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use scenegen::physics::PhysicsWorld;
use scenegen::pipeline::Generator;
use scenegen::render::{NullRenderer, ProgressRenderer, Renderer};
use scenegen::settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    log::info!("{}", settings);

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let generator = Generator::new(settings);
    let mut renderer: Box<dyn Renderer> = if generator.settings.visualize {
        Box::new(ProgressRenderer::new(generator.total_frames()))
    } else {
        Box::new(NullRenderer)
    };
    let mut world = physics_world();

    let generation = generator.run(world.as_mut(), renderer.as_mut(), &mut rng)?;
    println!(
        "wrote {} objects to {}",
        generation.summary.exported,
        generation.summary.output.display()
    );
    Ok(())
}

#[cfg(feature = "rapier")]
fn physics_world() -> Box<dyn PhysicsWorld> {
    Box::new(scenegen::rapier_world::RapierWorld::new())
}

#[cfg(not(feature = "rapier"))]
fn physics_world() -> Box<dyn PhysicsWorld> {
    log::warn!("built without a physics engine, objects will not move");
    Box::new(scenegen::scripted::ScriptedWorld::new())
}
