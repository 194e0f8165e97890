/// Penetration depth beyond which a contact counts as a bad contact.
pub const CONTACT_DEPTH_THRESHOLD: f32 = 0.05;
/// Bodies whose vertical position drops below this have fallen out of the scene.
pub const FLOOR_THRESHOLD: f32 = -7.0;
/// Linear speed above which a body is still considered moving.
pub const MAX_SETTLED_SPEED: f32 = 1.0;
/// Angular speed (rad/s) above which a body is still considered spinning.
pub const MAX_SETTLED_SPIN: f32 = 2.0;
/// Vertical lift applied to the surviving half of a bad contact pair.
pub const NUDGE_HEIGHT: f32 = 0.1;
/// Gap left between a corrected object face and the scene bound.
pub const PLACEMENT_EPSILON: f32 = 1e-3;
/// Minimum distance for vertices to be considered the same after scaling.
pub const VERTEX_MERGE_DISTANCE: f32 = 1e-3;
/// Lower bound on the number of objects drawn per pass (capped by the pass maximum).
pub const MIN_OBJECTS_PER_PASS: usize = 5;
/// Inset from the scene bounds when drawing large object positions.
pub const LARGE_OBJECT_MARGIN: f32 = 0.1;
/// Inset from the scene bounds when drawing small object positions.
pub const SMALL_OBJECT_MARGIN: f32 = 0.3;
/// Lowest start height of a small object above the scene floor.
pub const SMALL_OBJECT_DROP_MARGIN: f32 = 0.6;
/// Mass of a large object body.
pub const LARGE_OBJECT_MASS: f32 = 1000.0;
/// Mass of a small object body.
pub const SMALL_OBJECT_MASS: f32 = 10.0;
/// Full extents of the fallback ground box.
pub const GROUND_SIZE: [f32; 3] = [250.0, 4.0, 250.0];
/// Friction of the layout shell.
pub const LAYOUT_FRICTION: f32 = 0.4;
/// Friction of large objects.
pub const LARGE_OBJECT_FRICTION: f32 = 0.5;
/// Friction of small objects, high so they stay where they land.
pub const SMALL_OBJECT_FRICTION: f32 = 0.8;
/// Friction of the fallback ground.
pub const GROUND_FRICTION: f32 = 0.9;
