//! The viewer instance
//!
//! [`Viewer`] owns everything one drop zone needs: the scene, camera and
//! controls, the helpers and lights, LOD and selection state, and the render
//! scheduler. Hosts drive it with [`Viewer::tick`] once per display refresh
//! and forward window events through [`Viewer::handle_window_event`].

pub mod framing;
pub mod lights;
pub mod lod;
pub mod overlay;
pub mod picking;
pub mod schedule;
pub mod state;
pub mod throttle;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use winit::event::WindowEvent;

use crate::assets::{
    AssetBundle, LoadOutput, LoadScope, Locator, MeshDecompressor, MetadataSlot,
    ObjectUrlRegistry, ResolveHook, SceneLoader,
};
use crate::core::camera::Camera;
use crate::core::camera_controller::{ControlsEvent, OrbitControls};
use crate::core::config::ViewerConfig;
use crate::core::error::Error;
use crate::core::input::{DragButton, InputState, PointerAction};
use crate::core::time::{FrameStats, FrameTimer};
use crate::core::types::{Result, Vec3};
use crate::render::{Frame, HeadlessBackend, RenderBackend};
use crate::scene::{NodeContent, Scene, SceneNodeId, SceneStats};

pub use framing::{BoundingVolume, Framing};
pub use lights::LightRig;
pub use lod::{LodController, LodLevel};
pub use overlay::{AxesOverlay, Helpers};
pub use picking::{CanvasRect, Picker, Selection};
pub use schedule::{RenderScheduler, TickDecision};
pub use state::ViewerState;
pub use throttle::Throttle;

/// Summary of a completed load.
#[derive(Debug)]
pub struct LoadedScene {
    pub root: SceneNodeId,
    pub bounds: BoundingVolume,
    pub framing: Framing,
    pub stats: SceneStats,
    /// Non-fatal problems such as missing textures
    pub warnings: Vec<Error>,
    /// Nodes registered with the LOD controller
    pub detail_objects: usize,
}

/// One viewer instance.
pub struct Viewer<B: RenderBackend = HeadlessBackend> {
    config: ViewerConfig,
    backend: B,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    axes: AxesOverlay,
    helpers: Option<Helpers>,
    lights: Option<LightRig>,
    lod: LodController,
    picker: Picker,
    scheduler: RenderScheduler,
    resize_throttle: Throttle<(u32, u32)>,
    timer: FrameTimer,
    state: ViewerState,
    loader: SceneLoader,
    metadata: MetadataSlot,
    input: InputState,
    canvas: CanvasRect,
    content: Option<SceneNodeId>,
}

impl<B: RenderBackend> Viewer<B> {
    /// Create a viewer drawing a `width` x `height` canvas through `backend`.
    pub fn new(mut backend: B, config: ViewerConfig, width: u32, height: u32) -> Self {
        let mut camera = Camera::new(Vec3::ZERO, config.fov_degrees, 1.0);
        camera.set_aspect(width as f32, height as f32);
        backend.resize(width, height);

        let mut scene = Scene::new();
        let picker = Picker::new(&mut scene.materials, config.highlight_color);
        let state = ViewerState::default();
        let lights = state
            .add_lights
            .then(|| LightRig::add(&mut scene.graph, &state));
        let loader = SceneLoader::new(ObjectUrlRegistry::new(), config.asset_base_dir.clone());

        Self {
            axes: AxesOverlay::new(&camera),
            lod: LodController::new(config.lod_levels.clone()),
            resize_throttle: Throttle::new(config.resize_throttle()),
            canvas: CanvasRect::sized(width as f32, height as f32),
            config,
            backend,
            scene,
            camera,
            controls: OrbitControls::new(),
            helpers: None,
            lights,
            picker,
            scheduler: RenderScheduler::new(),
            timer: FrameTimer::new(),
            state,
            loader,
            metadata: MetadataSlot::Empty,
            input: InputState::new(),
            content: None,
        }
    }

    /// Registry that transient locators for this viewer live in.
    pub fn registry(&self) -> &ObjectUrlRegistry {
        self.loader.registry()
    }

    pub fn register_decompressor(&mut self, decompressor: Arc<dyn MeshDecompressor>) {
        self.loader.register_decompressor(decompressor);
    }

    pub fn set_resolve_hook(&mut self, hook: Box<dyn ResolveHook + Send>) {
        self.loader.set_resolve_hook(hook);
    }

    pub fn clear_resolve_hook(&mut self) {
        self.loader.clear_resolve_hook();
    }

    /// Load `entry` as the new content, replacing whatever is shown.
    ///
    /// Every transient locator minted while resolving references is revoked
    /// before this returns, on success and on failure alike.
    ///
    /// Disposal records of the previous content stay queryable until the
    /// next load, which prunes them.
    pub async fn load(&mut self, entry: &Locator, root_path: &str, bundle: &AssetBundle) -> Result<LoadedScene> {
        let pruned = self.scene.resources.prune_disposed();
        if pruned > 0 {
            log::debug!("Pruned {} disposed resource records", pruned);
        }
        self.clear();

        let mut scope = LoadScope::new(self.loader.registry().clone());
        let parent = self.scene.graph.root();
        let result = self
            .loader
            .load(entry, root_path, bundle, &mut scope, &mut self.scene, parent)
            .await;

        let result = result.map(|output| self.install(output, Instant::now()));
        let revoked = scope.release();
        match &result {
            Ok(loaded) => log::info!(
                "Loaded {}: {} ({} transient locators released)",
                entry,
                loaded.stats,
                revoked
            ),
            Err(e) => log::error!("Failed to load {}: {}", entry, e),
        }
        result
    }

    /// Find the entry asset in `bundle`, load it and revoke its locator.
    pub async fn load_bundle(&mut self, bundle: &AssetBundle) -> Result<LoadedScene> {
        let entry = bundle.find_entry()?;
        let bytes = bundle
            .get(&entry.key)
            .cloned()
            .ok_or_else(|| Error::Load(format!("entry {} vanished from the bundle", entry.key)))?;
        let locator = self.registry().create(bytes);
        let result = self.load(&locator, &entry.root_path, bundle).await;
        self.registry().revoke(&locator);
        result
    }

    fn install(&mut self, output: LoadOutput, now: Instant) -> LoadedScene {
        let root = output.root;
        self.content = Some(root);

        let framing = framing::frame(
            &mut self.scene,
            root,
            &mut self.camera,
            &mut self.controls,
            &mut self.axes,
        );
        let detail_objects = self.lod.discover(&self.scene.graph, root);
        self.lod.update(self.camera.position, &mut self.scene.graph);

        // Assets with their own lighting opt out of the default rig
        self.state.add_lights = !output.has_lights;
        self.sync_light_rig();
        self.apply_wireframe();

        if let Some((key, bytes)) = output.sidecar {
            log::info!("Decoding {} as object metadata", key);
            self.metadata = MetadataSlot::decode(bytes, self.config.metadata_id_field.clone());
        }

        let stats = SceneStats::collect(&self.scene, root);
        log::info!("Scene stats: {}", stats);
        self.scheduler.arm(now, self.config.settle_window());

        LoadedScene {
            root,
            bounds: framing.bounds,
            framing,
            stats,
            warnings: output.warnings,
            detail_objects,
        }
    }

    /// Dispose the current content and everything tied to it. No-op when
    /// nothing is loaded.
    pub fn clear(&mut self) {
        let Some(root) = self.content.take() else {
            return;
        };
        self.picker.restore(&mut self.scene);
        let disposed = self.scene.dispose_subtree(root);
        for id in &disposed.geometries {
            self.backend.release_geometry(*id);
        }
        for id in &disposed.textures {
            self.backend.release_texture(*id);
        }
        self.lod.clear_objects();
        self.metadata = MetadataSlot::Empty;
        log::debug!(
            "Cleared {} nodes, {} geometries, {} textures",
            disposed.nodes,
            disposed.geometries.len(),
            disposed.textures.len()
        );
    }

    /// Advance one display refresh.
    pub fn tick(&mut self, now: Instant) -> TickDecision {
        self.timer.tick_at(now);
        self.metadata.poll();

        if let Some((width, height)) = self.resize_throttle.flush(now) {
            self.apply_resize(width, height, now);
        }

        if self.controls.update(&mut self.camera) {
            // Keep drawing for as long as the camera keeps moving
            if self.controls.is_interacting() || self.controls.auto_rotate {
                self.on_controls(ControlsEvent::Change, now);
            } else {
                self.lod.update(self.camera.position, &mut self.scene.graph);
            }
        }

        let decision = self.scheduler.poll(now);
        if decision.renders() {
            self.render(decision == TickDecision::FinalRender);
        }
        decision
    }

    fn render(&mut self, final_frame: bool) {
        self.axes.sync(&self.camera);
        if let Some(rig) = &self.lights {
            rig.follow(&mut self.scene.graph, &self.camera);
        }
        self.scene.graph.update_world_transforms();
        self.backend.render(&Frame {
            scene: &self.scene,
            camera: &self.camera,
            axes_camera: &self.axes.camera,
            clear_color: self.config.clear_color,
            final_frame,
        });
        self.timer.record_render();
    }

    /// Translate a winit event and act on it.
    pub fn handle_window_event(&mut self, event: &WindowEvent, now: Instant) {
        if let Some(action) = self.input.process_event(event) {
            self.pointer(action, now);
        }
    }

    /// Act on an already translated pointer or viewport action.
    pub fn pointer(&mut self, action: PointerAction, now: Instant) {
        match action {
            PointerAction::Pressed { .. } => {
                let event = self.controls.begin_interaction();
                self.on_controls(event, now);
            }
            PointerAction::Dragged { dx, dy, button: DragButton::Orbit } => {
                self.controls.rotate(dx, dy, self.canvas.height);
            }
            PointerAction::Dragged { dx, dy, button: DragButton::Pan } => {
                self.controls.pan(dx, dy, &self.camera, self.canvas.height);
            }
            PointerAction::Released { x, y, click } => {
                let event = self.controls.end_interaction();
                self.on_controls(event, now);
                if click {
                    self.click(x, y);
                }
            }
            PointerAction::Wheel { steps } => {
                self.controls.dolly(steps);
                self.scheduler.arm(now, self.config.interaction_window());
            }
            PointerAction::Resized { width, height } => self.resize(width, height, now),
        }
    }

    /// Every controls event arms the interaction window; a camera change
    /// also re-evaluates LOD.
    fn on_controls(&mut self, event: ControlsEvent, now: Instant) {
        if event == ControlsEvent::Change {
            self.lod.update(self.camera.position, &mut self.scene.graph);
        }
        self.scheduler.arm(now, self.config.interaction_window());
    }

    /// Throttled viewport resize.
    pub fn resize(&mut self, width: u32, height: u32, now: Instant) {
        if let Some((width, height)) = self.resize_throttle.call(now, (width, height)) {
            self.apply_resize(width, height, now);
        }
    }

    fn apply_resize(&mut self, width: u32, height: u32, now: Instant) {
        self.canvas.width = width as f32;
        self.canvas.height = height as f32;
        self.camera.set_aspect(width as f32, height as f32);
        self.axes.camera.set_aspect(width as f32, height as f32);
        self.backend.resize(width, height);
        self.scheduler.arm(now, self.config.resize_window());
    }

    /// Move the canvas within the window, e.g. after a layout change.
    pub fn set_canvas_origin(&mut self, left: f32, top: f32) {
        self.canvas.left = left;
        self.canvas.top = top;
    }

    /// Select the object under window point `(x, y)`.
    pub fn click(&mut self, x: f32, y: f32) -> Option<SceneNodeId> {
        self.picker.pick(&mut self.scene, &self.camera, x, y, &self.canvas)
    }

    pub fn selected(&self) -> Option<SceneNodeId> {
        self.picker.selected()
    }

    /// Sidecar entry for the selected object, matched on the identifier of
    /// the node or its nearest ancestor that has one.
    pub fn selected_metadata(&mut self) -> Option<&Value> {
        self.metadata.poll();
        let node = self.picker.selected()?;
        let id = self
            .scene
            .graph
            .ancestors(node)
            .find_map(|n| n.identifier.as_deref())?;
        self.metadata.get()?.get(id)
    }

    pub fn metadata(&self) -> &MetadataSlot {
        &self.metadata
    }

    /// Return the camera to where the last load framed it.
    pub fn reset_view(&mut self, now: Instant) {
        let event = self.controls.reset(&mut self.camera);
        self.on_controls(event, now);
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Mutable display state. Call [`update_display`](Self::update_display)
    /// or [`update_lights`](Self::update_lights) to apply changes.
    pub fn state_mut(&mut self) -> &mut ViewerState {
        &mut self.state
    }

    /// Apply wireframe, grid and auto-rotate from the display state.
    pub fn update_display(&mut self, now: Instant) {
        self.apply_wireframe();
        match (self.state.grid, self.helpers) {
            (true, None) => self.helpers = Some(Helpers::add(&mut self.scene.graph)),
            (false, Some(helpers)) => {
                helpers.remove(&mut self.scene.graph);
                self.helpers = None;
            }
            _ => {}
        }
        self.controls.auto_rotate = self.state.auto_rotate;
        self.scheduler.arm(now, self.config.interaction_window());
    }

    /// Add, remove or retune the default light rig from the display state.
    pub fn update_lights(&mut self, now: Instant) {
        self.sync_light_rig();
        self.scheduler.arm(now, self.config.interaction_window());
    }

    fn sync_light_rig(&mut self) {
        match (self.state.add_lights, self.lights) {
            (true, None) => self.lights = Some(LightRig::add(&mut self.scene.graph, &self.state)),
            (false, Some(rig)) => {
                rig.remove(&mut self.scene.graph);
                self.lights = None;
            }
            _ => {}
        }
        if let Some(rig) = &self.lights {
            rig.apply(&mut self.scene.graph, &self.state);
        }
    }

    fn apply_wireframe(&mut self) {
        let Some(root) = self.content else {
            return;
        };
        for id in self.scene.materials_in(root) {
            if let Some(material) = self.scene.materials.get_mut(id) {
                material.wireframe = self.state.wireframe;
            }
        }
    }

    pub fn content_root(&self) -> Option<SceneNodeId> {
        self.content
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn axes(&self) -> &AxesOverlay {
        &self.axes
    }

    pub fn lights(&self) -> Option<LightRig> {
        self.lights
    }

    pub fn helpers(&self) -> Option<Helpers> {
        self.helpers
    }

    pub fn lod(&self) -> &LodController {
        &self.lod
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.timer.stats()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Content nodes currently hidden by LOD or otherwise.
    pub fn hidden_nodes(&self) -> Vec<SceneNodeId> {
        let Some(root) = self.content else {
            return Vec::new();
        };
        self.scene
            .graph
            .subtree(root)
            .into_iter()
            .filter(|id| self.scene.graph.get(*id).is_some_and(|n| !n.visible))
            .collect()
    }

    /// Number of mesh nodes under the content root.
    pub fn mesh_count(&self) -> usize {
        let Some(root) = self.content else {
            return 0;
        };
        self.scene
            .graph
            .subtree(root)
            .into_iter()
            .filter(|id| {
                self.scene
                    .graph
                    .get(*id)
                    .is_some_and(|n| matches!(n.content, NodeContent::Mesh { .. }))
            })
            .count()
    }
}
