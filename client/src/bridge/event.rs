use inspect::Point;
use wasm_bindgen::JsCast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Click,
    Down,
    Leave,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
    Unknown,
}

impl MouseButton {
    fn from(button: i16) -> Self {
        // Reference:
        // https://developer.mozilla.org/en-US/docs/Web/API/MouseEvent/button
        match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            3 => MouseButton::Back,
            4 => MouseButton::Forward,
            _ => MouseButton::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct PointerEvent {
    pub action: MouseAction,
    pub button: MouseButton,

    /// Position in viewport coordinates.
    pub at: Point,
    pub target: Option<web_sys::EventTarget>,
}

impl PointerEvent {
    pub const EVENTS: [&'static str; 4] = ["click", "mousedown", "mousemove", "mouseup"];

    pub fn from_web_sys(event: &web_sys::Event) -> Option<PointerEvent> {
        let action = match event.type_().as_str() {
            "click" => MouseAction::Click,
            "mousedown" => MouseAction::Down,
            "mouseleave" => MouseAction::Leave,
            "mousemove" => MouseAction::Move,
            "mouseup" => MouseAction::Up,
            _ => return None,
        };
        let event = event.dyn_ref::<web_sys::MouseEvent>()?;

        Some(PointerEvent {
            action,
            button: MouseButton::from(event.button()),
            at: Point::new(event.client_x() as f32, event.client_y() as f32),
            target: event.target(),
        })
    }
}
