//! Weighted object libraries.
//!
//! A library is built from a description file (one descriptor per line) and,
//! for each size category, an optional probability file giving the relative
//! weight of each class. Drawing an object first picks a class from the
//! cumulative table, then a uniform descriptor of that class.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use crate::error::{Result, SceneError};
use crate::object::{category_name, ObjectDescriptor};


/// Cumulative class weights for one size category.
///
/// Each entry holds the running total of integer percents up to and including
/// that class, so the table is non-decreasing and its last weight is the sum
/// of all class weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbabilityTable {
    entries: Vec<(u32, String)>,
}

impl ProbabilityTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Parses `class probability` lines. Probabilities lie in `[0, 1]` and are
    /// truncated to an integer percent before accumulation.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut entries: Vec<(u32, String)> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let line_no = index + 1;
            let [class, probability] = fields[..] else {
                return Err(SceneError::malformed(
                    path,
                    line_no,
                    format!("expected 'class probability', got {} fields", fields.len()),
                ));
            };
            let probability: f64 = probability
                .parse()
                .map_err(|_| SceneError::malformed(path, line_no, format!("invalid probability '{probability}'")))?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(SceneError::malformed(
                    path,
                    line_no,
                    format!("probability {probability} outside [0, 1]"),
                ));
            }

            let weight = (probability * 100.0) as u32;
            let previous = entries.last().map_or(0, |(w, _)| *w);
            entries.push((previous + weight, class.to_string()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(u32, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.last().map_or(0, |(w, _)| *w)
    }

    /// Picks a class name. A single-entry table is returned without drawing,
    /// so it never touches the random stream.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        match self.entries.as_slice() {
            [] => None,
            [(_, only)] => Some(only.as_str()),
            entries => {
                let pick = rng.random_range(0..=self.total_weight());
                entries
                    .iter()
                    .find(|(weight, _)| *weight >= pick)
                    .map(|(_, class)| class.as_str())
            }
        }
    }
}

/// Descriptors grouped by class, split into large and small categories.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub large_objects: BTreeMap<String, Vec<Arc<ObjectDescriptor>>>,
    pub small_objects: BTreeMap<String, Vec<Arc<ObjectDescriptor>>>,
    pub large_probability: Option<ProbabilityTable>,
    pub small_probability: Option<ProbabilityTable>,
}

impl Library {
    /// Reads a library description and its optional probability tables.
    ///
    /// Mesh paths in the description are relative to `root`.
    pub fn load(
        root: &Path,
        description: &Path,
        large_probability: Option<&Path>,
        small_probability: Option<&Path>,
    ) -> Result<Library> {
        let text = fs::read_to_string(description)?;
        let mut library = Library::default();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let descriptor = parse_descriptor(root, line).map_err(|reason| SceneError::malformed(description, index + 1, reason))?;
            library.insert(descriptor);
        }

        library.large_probability = large_probability.map(ProbabilityTable::from_file).transpose()?;
        library.small_probability = small_probability.map(ProbabilityTable::from_file).transpose()?;

        library.summary();
        Ok(library)
    }

    pub fn insert(&mut self, descriptor: ObjectDescriptor) {
        let objects = if descriptor.is_large {
            &mut self.large_objects
        } else {
            &mut self.small_objects
        };
        objects
            .entry(descriptor.name.clone())
            .or_default()
            .push(Arc::new(descriptor));
    }

    /// Draws a class from the category's table, then a uniform descriptor of
    /// that class.
    pub fn draw_random<R: Rng + ?Sized>(&self, rng: &mut R, want_large: bool) -> Result<Arc<ObjectDescriptor>> {
        let (objects, table) = if want_large {
            (&self.large_objects, &self.large_probability)
        } else {
            (&self.small_objects, &self.small_probability)
        };
        let category = category_name(want_large);

        let class = table
            .as_ref()
            .and_then(|t| t.draw(rng))
            .ok_or(SceneError::EmptyCategory { category, class: None })?;

        let candidates = objects
            .get(class)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SceneError::EmptyCategory {
                category,
                class: Some(class.to_string()),
            })?;

        let index = rng.random_range(0..candidates.len());
        let descriptor = &candidates[index];
        log::debug!("drew {} #{} ({})", class, index, descriptor.mesh_path.display());
        Ok(Arc::clone(descriptor))
    }

    /// Logs the number of descriptors per class and warns about table classes
    /// that have no descriptors.
    pub fn summary(&self) {
        for (is_large, objects, table) in [
            (true, &self.large_objects, &self.large_probability),
            (false, &self.small_objects, &self.small_probability),
        ] {
            let count: usize = objects.values().map(Vec::len).sum();
            log::info!(
                "{} library: {} classes, {} descriptors, probability table: {}",
                category_name(is_large),
                objects.len(),
                count,
                if table.is_some() { "yes" } else { "no" }
            );
            if let Some(table) = table {
                for (_, class) in table.entries() {
                    if !objects.contains_key(class) {
                        log::warn!("class '{}' has a probability but no {} descriptors", class, category_name(is_large));
                    }
                }
            }
        }
    }
}

/// Parses `mesh_file class tag min_volume max_volume is_large`.
fn parse_descriptor(root: &Path, line: &str) -> std::result::Result<ObjectDescriptor, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [file, name, tag, min_volume, max_volume, is_large] = fields[..] else {
        return Err(format!("expected 6 fields, got {}", fields.len()));
    };

    let min_volume: f32 = min_volume
        .parse()
        .map_err(|_| format!("invalid minimum volume '{min_volume}'"))?;
    let max_volume: f32 = max_volume
        .parse()
        .map_err(|_| format!("invalid maximum volume '{max_volume}'"))?;
    if !(min_volume > 0.0 && min_volume <= max_volume) {
        return Err(format!("volume range [{min_volume}, {max_volume}] must satisfy 0 < min <= max"));
    }

    let is_large = match is_large.to_ascii_lowercase().as_str() {
        "1" | "true" => true,
        "0" | "false" => false,
        other => return Err(format!("invalid large flag '{other}'")),
    };

    Ok(ObjectDescriptor {
        name: name.to_string(),
        mesh_path: root.join(file),
        tag: tag.to_string(),
        min_volume,
        max_volume,
        is_large,
    })
}
