use std::cell::RefCell;
use std::rc::Rc;

use lanyard_core::{LanyardConfig, LanyardError, LogObserver, Scene};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, PointerEvent, Window};

mod assets;
mod canvas;
mod constants;
mod state;
mod utils;

use crate::constants::{CANVAS_ID, CONFIG_DIR};
use crate::state::{STATE, State};
use crate::utils::{
    asset_url, event_ndc, fetch_text_with_fallbacks, get_query_param, log_level, sync_canvas_size,
};

fn init_canvas(
    document: &Document,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let cv = document
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| JsValue::from_str(&format!("canvas #{CANVAS_ID} not found")))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = cv
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((cv, ctx))
}

fn set_cursor(canvas: &HtmlCanvasElement, css: &str) {
    let _ = canvas.style().set_property("cursor", css);
}

fn resize(s: &mut State) {
    let (w, h) = sync_canvas_size(&s.window, &s.canvas);
    s.scene.resize(w, h);
}

fn attach_ui(state: Rc<RefCell<State>>) -> Result<(), JsValue> {
    let canvas = state.borrow().canvas.clone();
    let window = state.borrow().window.clone();

    {
        let st = state.clone();
        let pointerdown = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            let mut s = st.borrow_mut();
            if !s.running {
                return;
            }
            let ndc = event_ndc(&e, &s.canvas);
            match s.scene.pointer_down(e.pointer_id(), ndc) {
                Ok(true) => {
                    let _ = s.canvas.set_pointer_capture(e.pointer_id());
                    set_cursor(&s.canvas, s.scene.cursor().as_css());
                }
                Ok(false) => {}
                Err(err) => log::warn!("pointer down ignored: {err}"),
            }
        }));
        canvas.add_event_listener_with_callback("pointerdown", pointerdown.as_ref().unchecked_ref())?;
        pointerdown.forget();
    }
    {
        let st = state.clone();
        let pointermove = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            let mut s = st.borrow_mut();
            if !s.running {
                return;
            }
            let ndc = event_ndc(&e, &s.canvas);
            let cursor = s.scene.pointer_move(ndc);
            set_cursor(&s.canvas, cursor.as_css());
        }));
        canvas.add_event_listener_with_callback("pointermove", pointermove.as_ref().unchecked_ref())?;
        pointermove.forget();
    }
    {
        let st = state.clone();
        let pointerup = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            let mut s = st.borrow_mut();
            if !s.running {
                return;
            }
            match s.scene.pointer_up(e.pointer_id()) {
                Ok(Some(id)) => s.release_pointer(id),
                Ok(None) => {}
                Err(err) => log::warn!("pointer up: {err}"),
            }
            set_cursor(&s.canvas, s.scene.cursor().as_css());
        }));
        for ev in ["pointerup", "pointercancel"] {
            canvas.add_event_listener_with_callback(ev, pointerup.as_ref().unchecked_ref())?;
        }
        pointerup.forget();
    }
    {
        let st = state.clone();
        let pointerleave = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |_e: PointerEvent| {
            let mut s = st.borrow_mut();
            if !s.running {
                return;
            }
            s.scene.pointer_leave();
            set_cursor(&s.canvas, s.scene.cursor().as_css());
        }));
        canvas.add_event_listener_with_callback("pointerleave", pointerleave.as_ref().unchecked_ref())?;
        pointerleave.forget();
    }
    {
        let st = state;
        let onresize = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let mut s = st.borrow_mut();
            if s.running {
                resize(&mut s);
            }
        }));
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }
    Ok(())
}

type RafClosure = Closure<dyn FnMut(f64)>;

fn request_frame(f: &Rc<RefCell<Option<RafClosure>>>) -> Option<i32> {
    let window = web_sys::window()?;
    let cb = f.borrow();
    window
        .request_animation_frame(cb.as_ref()?.as_ref().unchecked_ref())
        .ok()
}

fn start_animation(state: Rc<RefCell<State>>) {
    let f: Rc<RefCell<Option<RafClosure>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    let st = state.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let Ok(mut s) = st.try_borrow_mut() else {
            // another callback holds the state; try again next frame
            request_frame(&f);
            return;
        };
        if !s.running {
            return;
        }
        let dt = s
            .last_ts
            .map(|prev| ((ts - prev) / 1000.0) as f32)
            .unwrap_or(0.0);
        s.last_ts = Some(ts);
        let out = s.scene.frame(ts, dt, &mut LogObserver);
        if let Some(id) = s.scene.take_released_pointer() {
            s.release_pointer(id);
        }
        let (w, h) = (s.canvas.width() as f64, s.canvas.height() as f64);
        canvas::draw(
            &s.ctx,
            w,
            h,
            s.scene.camera(),
            s.scene.config().card.face_size,
            &s.textures,
            &out,
        );
        s.raf_id = request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    state.borrow_mut().raf_id = request_frame(&g);
}

fn build_scene(
    window: &Window,
    config: LanyardConfig,
    width: f64,
    height: f64,
) -> Result<Scene, LanyardError> {
    let now = window.performance().map(|p| p.now()).unwrap_or_default();
    let mut scene = Scene::new(config, now, (width / height.max(1.0)) as f32)?;
    scene.resize(width, height);
    Ok(scene)
}

async fn fetch_config(window: &Window, name: &str) -> Result<LanyardConfig, String> {
    let rel = format!("{CONFIG_DIR}/{name}.json");
    let text = fetch_text_with_fallbacks(window, &[&asset_url(&rel), &rel])
        .await
        .ok_or_else(|| format!("{rel} not found"))?;
    LanyardConfig::from_json(&text).map_err(|e| e.to_string())
}

/// Swap in a config fetched after start-up. The scene restarts with it.
fn apply_config(config: LanyardConfig) {
    STATE.with(|st| {
        if let Some(st_rc) = st.borrow().as_ref() {
            let mut s = st_rc.borrow_mut();
            if !s.running {
                return;
            }
            let (w, h) = sync_canvas_size(&s.window, &s.canvas);
            let mut scene = match build_scene(&s.window, config, w, h) {
                Ok(scene) => scene,
                Err(e) => {
                    log::warn!("config override rejected: {e}");
                    return;
                }
            };
            if let Some(id) = s.scene.teardown() {
                s.release_pointer(id);
            }
            for kind in lanyard_core::AssetKind::ALL {
                if s.textures.get(kind).is_some() {
                    scene.asset_loaded(kind);
                }
            }
            s.scene = scene;
            s.last_ts = None;
            log::info!("config override applied");
            if log::log_enabled!(log::Level::Debug)
                && let Ok(json) = serde_json::to_string(s.scene.config())
            {
                log::debug!("effective config: {json}");
            }
        }
    });
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let search = window.location().search().unwrap_or_default();

    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log_level(&search));

    let (canvas, ctx) = init_canvas(&document)?;
    let (w, h) = sync_canvas_size(&window, &canvas);
    let scene = build_scene(&window, LanyardConfig::default(), w, h)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let state = Rc::new(RefCell::new(State {
        window: window.clone(),
        canvas,
        ctx,
        scene,
        textures: assets::Textures::default(),
        last_ts: None,
        raf_id: None,
        running: true,
    }));
    STATE.with(|st| st.replace(Some(state.clone())));

    if let Some(name) = get_query_param(&search, "config") {
        let win = window.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_config(&win, &name).await {
                Ok(config) => apply_config(config),
                Err(err) => log::warn!("config '{name}' not applied: {err}"),
            }
        });
    }

    assets::load_textures(&state)?;
    attach_ui(state.clone())?;
    start_animation(state);
    log::info!("lanyard started");
    Ok(())
}

/// Stop the frame loop and release any pointer still captured by a drag.
#[wasm_bindgen]
pub fn stop() {
    let Some(st_rc) = STATE.with(|st| st.borrow_mut().take()) else {
        return;
    };
    let mut s = st_rc.borrow_mut();
    s.running = false;
    if let Some(id) = s.raf_id.take() {
        let _ = s.window.cancel_animation_frame(id);
    }
    if let Some(id) = s.scene.teardown() {
        s.release_pointer(id);
    }
    set_cursor(&s.canvas, "auto");
    log::info!("lanyard stopped");
}
