pub mod config;
pub mod contact;
pub mod error;
pub mod geom;
pub mod library;
pub mod object;
pub mod output;
pub mod physics;
pub mod pipeline;
pub mod placement;
#[cfg(feature = "rapier")]
pub mod rapier_world;
pub mod remediation;
pub mod render;
pub mod scene;
pub mod scripted;
pub mod settings;
