//! Discrete level-of-detail switching by camera distance.
//!
//! Detail objects are scene nodes tagged with an index. Each [`LodLevel`]
//! names the indices visible from its distance threshold onwards; the
//! controller picks the farthest level the camera has passed and toggles
//! visibility to match.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::{SceneGraph, SceneNodeId};

/// One detail level: visible object indices from `distance_threshold` on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub distance_threshold: f32,
    pub visible: BTreeSet<usize>,
}

impl LodLevel {
    pub fn new(distance_threshold: f32, visible: impl IntoIterator<Item = usize>) -> Self {
        Self {
            distance_threshold,
            visible: visible.into_iter().collect(),
        }
    }

    /// Thresholds `[0, 100000, 200000]`, level `i` showing object `i`.
    pub fn default_levels() -> Vec<Self> {
        [0.0, 100_000.0, 200_000.0]
            .into_iter()
            .enumerate()
            .map(|(i, threshold)| Self::new(threshold, [i]))
            .collect()
    }
}

/// Detail index encoded in a node name ending in `LOD<n>`.
///
/// The suffix is case-insensitive and may be preceded by `_`, `-` or `.`.
///
/// # Examples
///
/// ```
/// use dropview::viewer::lod::lod_index;
///
/// assert_eq!(lod_index("Tree_LOD2"), Some(2));
/// assert_eq!(lod_index("rock.lod0"), Some(0));
/// assert_eq!(lod_index("LODGE"), None);
/// ```
pub fn lod_index(name: &str) -> Option<usize> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let (head, number) = name.split_at(name.len() - digits);
    if !head.to_ascii_lowercase().ends_with("lod") {
        return None;
    }
    number.parse().ok()
}

/// Level selection state machine over a fixed set of detail objects.
pub struct LodController {
    levels: Vec<LodLevel>,
    objects: Vec<(usize, SceneNodeId)>,
    selected: Option<usize>,
}

impl LodController {
    /// Levels are sorted by threshold; duplicate thresholds keep the first.
    pub fn new(mut levels: Vec<LodLevel>) -> Self {
        levels.sort_by(|a, b| a.distance_threshold.total_cmp(&b.distance_threshold));
        levels.dedup_by(|later, earlier| later.distance_threshold == earlier.distance_threshold);
        Self {
            levels,
            objects: Vec::new(),
            selected: None,
        }
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Index of the active level, if any.
    pub fn selected_level(&self) -> Option<usize> {
        self.selected
    }

    pub fn objects(&self) -> &[(usize, SceneNodeId)] {
        &self.objects
    }

    pub fn register(&mut self, index: usize, node: SceneNodeId) {
        self.objects.push((index, node));
    }

    /// Forget every detail object and return to "no level".
    pub fn clear_objects(&mut self) {
        self.objects.clear();
        self.selected = None;
    }

    /// Register every node under `root` whose name carries a `LOD<n>` suffix.
    /// Returns how many were found.
    pub fn discover(&mut self, graph: &SceneGraph, root: SceneNodeId) -> usize {
        let before = self.objects.len();
        for id in graph.subtree(root) {
            if let Some(index) = graph.get(id).and_then(|n| lod_index(&n.name)) {
                self.register(index, id);
            }
        }
        let found = self.objects.len() - before;
        if found > 0 {
            log::debug!("Discovered {} detail objects", found);
        }
        found
    }

    /// Last level, in ascending threshold order, that `distance` has reached.
    pub fn level_for(&self, distance: f32) -> Option<usize> {
        self.levels
            .iter()
            .rposition(|level| level.distance_threshold <= distance)
    }

    /// Re-evaluate for a camera at `camera_position`.
    ///
    /// Distance is measured to the world origin. Without levels or objects
    /// nothing is touched.
    pub fn update(&mut self, camera_position: Vec3, graph: &mut SceneGraph) -> Option<usize> {
        if self.levels.is_empty() || self.objects.is_empty() {
            self.selected = None;
            return None;
        }
        let Some(level) = self.level_for(camera_position.length()) else {
            return self.selected;
        };

        let visible = &self.levels[level].visible;
        for &(index, node) in &self.objects {
            graph.set_visible(node, visible.contains(&index));
        }
        if self.selected != Some(level) {
            log::debug!(
                "LOD level {:?} -> {} at distance {:.1}",
                self.selected,
                level,
                camera_position.length()
            );
        }
        self.selected = Some(level);
        self.selected
    }
}
