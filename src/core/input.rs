//! Pointer and viewport input translated from winit window events

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Maximum pointer travel, in pixels, for a press/release pair to count as a click.
pub const CLICK_SLOP_PX: f32 = 4.0;

/// Pixels of wheel travel treated as one dolly step.
const PIXELS_PER_WHEEL_STEP: f32 = 100.0;

/// Viewer-level interpretation of a window event
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerAction {
    /// Primary or secondary button went down.
    Pressed { x: f32, y: f32, button: DragButton },
    /// Pointer moved while a button is held.
    Dragged { dx: f32, dy: f32, button: DragButton },
    /// Button released; `click` is set when the pointer barely moved.
    Released { x: f32, y: f32, click: bool },
    /// Wheel scrolled; positive steps move towards the target.
    Wheel { steps: f32 },
    /// Viewport resized to the given physical size.
    Resized { width: u32, height: u32 },
}

/// What a drag with the held button does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragButton {
    Orbit,
    Pan,
}

/// Tracks pointer state between events
pub struct InputState {
    /// Current pointer position
    pointer_position: (f32, f32),
    /// Held button and where it went down
    pressed: Option<(DragButton, (f32, f32))>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pointer_position: (0.0, 0.0),
            pressed: None,
        }
    }

    /// Process a window event
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<PointerAction> {
        match event {
            WindowEvent::Resized(size) => Some(PointerAction::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32)
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let drag = match button {
                    MouseButton::Left => DragButton::Orbit,
                    MouseButton::Right | MouseButton::Middle => DragButton::Pan,
                    _ => return None,
                };
                self.button(*state == ElementState::Pressed, drag)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
                };
                self.wheel(steps)
            }
            _ => None,
        }
    }

    /// Pointer moved to `(x, y)`.
    pub fn cursor_moved(&mut self, x: f32, y: f32) -> Option<PointerAction> {
        let (px, py) = self.pointer_position;
        self.pointer_position = (x, y);
        self.pressed.map(|(button, _)| PointerAction::Dragged {
            dx: x - px,
            dy: y - py,
            button,
        })
    }

    /// A button changed state at the current pointer position.
    pub fn button(&mut self, pressed: bool, button: DragButton) -> Option<PointerAction> {
        let (x, y) = self.pointer_position;
        if pressed {
            if self.pressed.is_some() {
                return None;
            }
            self.pressed = Some((button, (x, y)));
            Some(PointerAction::Pressed { x, y, button })
        } else {
            let (held, (ox, oy)) = self.pressed?;
            if held != button {
                return None;
            }
            self.pressed = None;
            let travel = ((x - ox).powi(2) + (y - oy).powi(2)).sqrt();
            Some(PointerAction::Released {
                x,
                y,
                click: held == DragButton::Orbit && travel <= CLICK_SLOP_PX,
            })
        }
    }

    /// Wheel scrolled by `steps` lines; wheel-up is positive.
    pub fn wheel(&mut self, steps: f32) -> Option<PointerAction> {
        if steps == 0.0 {
            return None;
        }
        Some(PointerAction::Wheel { steps })
    }

    /// Get current pointer position
    pub fn pointer_position(&self) -> (f32, f32) {
        self.pointer_position
    }

    /// Whether a button is held
    pub fn is_dragging(&self) -> bool {
        self.pressed.is_some()
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_resize_event() {
        let mut input = InputState::new();
        let action = input.process_event(&WindowEvent::Resized(PhysicalSize::new(800, 600)));
        assert_eq!(action, Some(PointerAction::Resized { width: 800, height: 600 }));
    }

    #[test]
    fn test_move_without_button_is_not_drag() {
        let mut input = InputState::new();
        assert_eq!(input.cursor_moved(10.0, 10.0), None);
        assert_eq!(input.pointer_position(), (10.0, 10.0));
    }

    #[test]
    fn test_click_within_slop() {
        let mut input = InputState::new();
        input.cursor_moved(100.0, 100.0);
        assert!(matches!(
            input.button(true, DragButton::Orbit),
            Some(PointerAction::Pressed { .. })
        ));
        input.cursor_moved(102.0, 101.0);
        assert_eq!(
            input.button(false, DragButton::Orbit),
            Some(PointerAction::Released { x: 102.0, y: 101.0, click: true })
        );
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_drag_is_not_click() {
        let mut input = InputState::new();
        input.cursor_moved(0.0, 0.0);
        input.button(true, DragButton::Orbit);
        assert_eq!(
            input.cursor_moved(30.0, -5.0),
            Some(PointerAction::Dragged { dx: 30.0, dy: -5.0, button: DragButton::Orbit })
        );
        assert_eq!(
            input.button(false, DragButton::Orbit),
            Some(PointerAction::Released { x: 30.0, y: -5.0, click: false })
        );
    }

    #[test]
    fn test_pan_release_never_clicks() {
        let mut input = InputState::new();
        input.button(true, DragButton::Pan);
        assert_eq!(
            input.button(false, DragButton::Pan),
            Some(PointerAction::Released { x: 0.0, y: 0.0, click: false })
        );
    }

    #[test]
    fn test_second_button_ignored_while_held() {
        let mut input = InputState::new();
        input.button(true, DragButton::Orbit);
        assert_eq!(input.button(true, DragButton::Pan), None);
        assert_eq!(input.button(false, DragButton::Pan), None);
        assert!(input.is_dragging());
    }

    #[test]
    fn test_zero_wheel_ignored() {
        let mut input = InputState::new();
        assert_eq!(input.wheel(0.0), None);
        assert_eq!(input.wheel(1.5), Some(PointerAction::Wheel { steps: 1.5 }));
    }
}
