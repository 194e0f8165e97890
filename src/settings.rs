use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};


/// Runtime configuration for the generator.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory the layout mesh paths are relative to.
    pub scene_root: PathBuf,
    pub scene_description: PathBuf,
    pub scene_probability: Option<PathBuf>,
    /// Directory the object mesh paths are relative to.
    pub library_root: PathBuf,
    pub library_description: PathBuf,
    pub large_probability: Option<PathBuf>,
    pub small_probability: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
    /// Physics step, seconds.
    #[serde(default = "default_timestep")]
    pub timestep: f32,
    /// Number of simulate-then-remediate cycles per object pass.
    #[serde(default = "default_settle_cycles")]
    pub settle_cycles: usize,
    #[serde(default = "default_settle_duration")]
    pub settle_duration: f32,
    /// Short burst right after small objects are dropped.
    #[serde(default = "default_drop_duration")]
    pub drop_duration: f32,
    /// Settling time after the layout is inserted.
    #[serde(default = "default_final_duration")]
    pub final_duration: f32,
    /// Large objects per unit of floor area, upper bound.
    #[serde(default = "default_large_density")]
    pub large_density: f32,
    /// Small objects per unit of floor area, upper bound.
    #[serde(default = "default_small_density")]
    pub small_density: f32,
    #[serde(default = "default_true")]
    pub place_on_large: bool,
    #[serde(default = "default_true")]
    pub ground: bool,
    #[serde(default)]
    pub visualize: bool,
}

fn default_timestep() -> f32 {
    0.02
}

fn default_settle_cycles() -> usize {
    10
}

fn default_settle_duration() -> f32 {
    0.5
}

fn default_drop_duration() -> f32 {
    0.04
}

fn default_final_duration() -> f32 {
    0.25
}

fn default_large_density() -> f32 {
    0.5
}

fn default_small_density() -> f32 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Where the scene is written. Without a configured path the file is
    /// named after the current local time.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("scene_{}.txt", chrono::Local::now().format("%Y%m%d_%H%M%S"))),
        }
    }

    /// Makes every relative input path relative to `root`.
    fn resolve_paths(&mut self, root: &Path) {
        for path in [
            &mut self.scene_root,
            &mut self.scene_description,
            &mut self.library_root,
            &mut self.library_description,
        ] {
            *path = resolve(root, path);
        }
        for path in [
            &mut self.scene_probability,
            &mut self.large_probability,
            &mut self.small_probability,
        ]
        .into_iter()
        .flatten()
        {
            *path = resolve(root, path);
        }
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Loads `config/default.toml` only, without environment or command line.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;
    config.resolve_paths(&root);

    validate_config(&config)?;

    Ok(config)
}

/// Loads the configuration file, then environment variables prefixed with
/// `SCENEGEN_`, then command-line flags. Paths from the file and environment
/// are relative to the project root, paths on the command line to the
/// working directory.
pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = if local_config.exists() {
        log::info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        log::info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("scenegen"))
        .build()
        .context("error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;

    config.resolve_paths(&root);
    let args = CliArgs::parse();
    let cwd = env::current_dir().context("failed to get the working directory")?;
    apply_overrides(&mut config, &args, &cwd);

    validate_config(&config)?;

    log::debug!("{:#?}", config);

    Ok(config)
}

/// A description given without its root takes the description's directory
/// as the mesh root.
fn apply_overrides(config: &mut Settings, args: &CliArgs, cwd: &Path) {
    if let Some(description) = &args.scenes {
        config.scene_description = resolve(cwd, description);
        config.scene_root = parent_dir(&config.scene_description);
    }
    if let Some(root) = &args.scene_root {
        config.scene_root = resolve(cwd, root);
    }
    if let Some(path) = &args.scene_probability {
        config.scene_probability = Some(resolve(cwd, path));
    }
    if let Some(description) = &args.library {
        config.library_description = resolve(cwd, description);
        config.library_root = parent_dir(&config.library_description);
    }
    if let Some(root) = &args.library_root {
        config.library_root = resolve(cwd, root);
    }
    if let Some(path) = &args.large_probability {
        config.large_probability = Some(resolve(cwd, path));
    }
    if let Some(path) = &args.small_probability {
        config.small_probability = Some(resolve(cwd, path));
    }
    if let Some(output) = &args.output {
        config.output = Some(resolve(cwd, output));
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(timestep) = args.timestep {
        config.timestep = timestep;
    }
    if let Some(cycles) = args.cycles {
        config.settle_cycles = cycles;
    }
    if let Some(density) = args.large_density {
        config.large_density = density;
    }
    if let Some(density) = args.small_density {
        config.small_density = density;
    }
    if args.scatter {
        config.place_on_large = false;
    }
    if args.no_ground {
        config.ground = false;
    }
    if args.visualize {
        config.visualize = true;
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the SCENEGEN_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
pub fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("SCENEGEN_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe().context("failed to get current executable path")?;
    let mut current_dir = exe_path.parent();
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir.to_path_buf());
        }
        current_dir = dir.parent();
    }
    Err(anyhow!("could not find project root directory, set SCENEGEN_ROOT_DIR"))
}

pub fn validate_config(config: &Settings) -> Result<()> {
    if !(config.timestep > 0.0) {
        bail!("timestep must be greater than 0, got {}", config.timestep);
    }
    if config.settle_cycles == 0 {
        bail!("settle_cycles must be at least 1");
    }
    for (name, value) in [
        ("settle_duration", config.settle_duration),
        ("drop_duration", config.drop_duration),
        ("final_duration", config.final_duration),
        ("large_density", config.large_density),
        ("small_density", config.small_density),
    ] {
        if !(value >= 0.0) {
            bail!("{} must not be negative, got {}", name, value);
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "scenegen - physically plausible indoor scene generation")]
pub struct CliArgs {
    /// Scene layout library description.
    #[arg(long)]
    scenes: Option<PathBuf>,

    /// Directory the layout mesh paths are relative to. Defaults to the
    /// directory of `--scenes`.
    #[arg(long)]
    scene_root: Option<PathBuf>,

    /// Layout class probabilities.
    #[arg(long)]
    scene_probability: Option<PathBuf>,

    /// Object library description.
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Directory the object mesh paths are relative to. Defaults to the
    /// directory of `--library`.
    #[arg(long)]
    library_root: Option<PathBuf>,

    /// Large object class probabilities.
    #[arg(long)]
    large_probability: Option<PathBuf>,

    /// Small object class probabilities.
    #[arg(long)]
    small_probability: Option<PathBuf>,

    /// Output scene file. Defaults to a timestamped name in the working directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Random seed for the generation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Physics timestep in seconds.
    #[arg(long)]
    timestep: Option<f32>,

    /// Number of settle cycles per object pass.
    #[arg(long)]
    cycles: Option<usize>,

    /// Maximum large objects per unit floor area.
    #[arg(long)]
    large_density: Option<f32>,

    /// Maximum small objects per unit floor area.
    #[arg(long)]
    small_density: Option<f32>,

    /// Drop small objects anywhere instead of on large objects.
    #[arg(long)]
    scatter: bool,

    /// Do not add a ground box under the layout.
    #[arg(long)]
    no_ground: bool,

    /// Show simulation progress.
    #[arg(short, long)]
    visualize: bool,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Scene Library: {}
  - Object Library: {}
  - Seed: {:?}
  - Timestep: {:.4}
  - Settle Cycles: {} x {:.3}s
  - Densities (large / small): {:.3} / {:.3}
  - Small Objects On Large: {}
  - Ground: {}
  ",
            self.scene_description.display(),
            self.library_description.display(),
            self.seed,
            self.timestep,
            self.settle_cycles,
            self.settle_duration,
            self.large_density,
            self.small_density,
            self.place_on_large,
            self.ground,
        )
    }
}
