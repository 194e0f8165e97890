use std::path::PathBuf;

/// Immutable template for a placeable class of object.
///
/// Descriptors are parsed once from a library description file and shared
/// (behind an `Arc`) by every placement that uses them.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDescriptor {
    pub name: String,        // class name, used to look up probabilities
    pub mesh_path: PathBuf,  // library root joined with the relative mesh file
    pub tag: String,         // semantic tag written to the export (e.g. ShapeNet wnid)
    pub min_volume: f32,     // smallest target volume, scene units cubed
    pub max_volume: f32,     // largest target volume, scene units cubed
    pub is_large: bool,      // large (furniture) or small (tabletop) category
}

impl ObjectDescriptor {
    pub fn category(&self) -> &'static str {
        category_name(self.is_large)
    }
}

pub(crate) fn category_name(is_large: bool) -> &'static str {
    if is_large {
        "large"
    } else {
        "small"
    }
}
