use std::cell::RefCell;
use std::rc::Rc;

use lanyard_core::Scene;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use crate::assets::Textures;

/// Everything the browser callbacks share, behind an `Rc<RefCell<_>>`.
pub struct State {
    pub window: Window,
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub scene: Scene,
    pub textures: Textures,
    /// Timestamp of the previous animation frame, ms.
    pub last_ts: Option<f64>,
    pub raf_id: Option<i32>,
    pub running: bool,
}

impl State {
    pub fn release_pointer(&self, pointer_id: i32) {
        if self.canvas.has_pointer_capture(pointer_id) {
            let _ = self.canvas.release_pointer_capture(pointer_id);
        }
    }
}

thread_local! {
    pub static STATE: RefCell<Option<Rc<RefCell<State>>>> = const { RefCell::new(None) };
}
