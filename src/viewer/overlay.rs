//! Axes overlay camera and the grid/axes helper pair.

use crate::core::camera::Camera;
use crate::scene::{HelperKind, NodeContent, SceneGraph, SceneNodeId};

/// Camera for the corner axes gizmo. Follows the main camera's orientation.
#[derive(Clone, Debug)]
pub struct AxesOverlay {
    pub camera: Camera,
}

impl AxesOverlay {
    pub fn new(main: &Camera) -> Self {
        Self { camera: main.clone() }
    }

    /// Copy placement and clip planes, as done after framing.
    pub fn place_like(&mut self, main: &Camera) {
        self.camera.position = main.position;
        self.camera.rotation = main.rotation;
        self.camera.near = main.near;
        self.camera.far = main.far;
    }

    /// Per-frame orientation sync.
    pub fn sync(&mut self, main: &Camera) {
        self.camera.position = main.position;
        self.camera.rotation = main.rotation;
    }
}

/// Grid and axes helper nodes toggled by the `grid` display flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Helpers {
    pub grid: SceneNodeId,
    pub axes: SceneNodeId,
}

impl Helpers {
    pub fn add(graph: &mut SceneGraph) -> Self {
        let root = graph.root();
        Self {
            grid: graph.add_child(root, "grid", NodeContent::Helper(HelperKind::Grid)),
            axes: graph.add_child(root, "axes", NodeContent::Helper(HelperKind::Axes)),
        }
    }

    pub fn remove(self, graph: &mut SceneGraph) {
        graph.remove(self.grid);
        graph.remove(self.axes);
    }
}
