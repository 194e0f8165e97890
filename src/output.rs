use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use nalgebra::{Matrix3, Point3};

use crate::contact::ContactRelation;
use crate::physics::PhysicsWorld;
use crate::remediation::{classify, Verdict};
use crate::scene::Scene;


/// Final pose of one exported object.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub mesh_path: PathBuf,
    pub tag: String,
    pub scale: f32,
    pub rotation: Matrix3<f32>,
    pub position: Point3<f32>,
}

/// Records for every object that is at rest and not in bad contact.
pub fn collect_records(scene: &Scene, world: &dyn PhysicsWorld) -> Vec<ExportRecord> {
    let relation = ContactRelation::validate(&world.contacts());
    let mut records = Vec::with_capacity(scene.moving_objects.len());
    for object in &scene.moving_objects {
        let Some(state) = world.body_state(object.body) else {
            continue;
        };
        let verdict = classify(&relation, object.body, &state);
        if verdict != Verdict::Settled {
            log::debug!("not exporting {} {}: {:?}", object.base.name, object.body, verdict);
            continue;
        }
        records.push(ExportRecord {
            mesh_path: object.base.mesh_path.clone(),
            tag: object.base.tag.clone(),
            scale: object.scale,
            rotation: state.rotation,
            position: state.position,
        });
    }
    records
}

/// Writes the scene description.
///
/// The first line names the layout mesh. Each object then takes six lines:
/// mesh path, tag, scale and the three rows of `[R | p]`.
pub fn write_scene<W: Write>(writer: &mut W, layout_path: &Path, records: &[ExportRecord]) -> io::Result<()> {
    writeln!(writer, "layout_file:{}", layout_path.display())?;
    for record in records {
        writeln!(writer, "{}", record.mesh_path.display())?;
        writeln!(writer, "{}", record.tag)?;
        writeln!(writer, "{:.6}", record.scale)?;
        for i in 0..3 {
            let row = record.rotation.row(i);
            writeln!(
                writer,
                "{} {:.6}",
                row.iter().map(|v| format!("{:.6}", v)).join(" "),
                record.position[i]
            )?;
        }
    }
    Ok(())
}

/// Writes the scene description to a file.
pub fn write_scene_file(path: &Path, layout_path: &Path, records: &[ExportRecord]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_scene(&mut writer, layout_path, records)?;
    writer.flush()
}
