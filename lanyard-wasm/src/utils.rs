use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, PointerEvent, Window};

/// Match the canvas backing store to its CSS box times the device pixel
/// ratio. Returns the CSS size.
pub fn sync_canvas_size(window: &Window, canvas: &HtmlCanvasElement) -> (f64, f64) {
    let dpr = window.device_pixel_ratio();
    let rect = canvas.get_bounding_client_rect();
    let (css_w, css_h) = (rect.width().max(1.0), rect.height().max(1.0));
    let target_w = (css_w * dpr).round().clamp(1.0, 10000.0) as u32;
    let target_h = (css_h * dpr).round().clamp(1.0, 10000.0) as u32;
    if canvas.width() != target_w {
        canvas.set_width(target_w);
    }
    if canvas.height() != target_h {
        canvas.set_height(target_h);
    }
    (css_w, css_h)
}

/// Client coordinates relative to a box, as NDC with +y up.
pub fn client_to_ndc(x: f64, y: f64, left: f64, top: f64, width: f64, height: f64) -> [f32; 2] {
    let nx = (x - left) / width.max(1.0) * 2.0 - 1.0;
    let ny = -((y - top) / height.max(1.0) * 2.0 - 1.0);
    [nx as f32, ny as f32]
}

pub fn event_ndc(e: &PointerEvent, canvas: &HtmlCanvasElement) -> [f32; 2] {
    let rect = canvas.get_bounding_client_rect();
    client_to_ndc(
        e.client_x() as f64,
        e.client_y() as f64,
        rect.left(),
        rect.top(),
        rect.width(),
        rect.height(),
    )
}

/// NDC back to backing-store pixels.
pub fn ndc_to_canvas(ndc_x: f32, ndc_y: f32, width: f64, height: f64) -> (f64, f64) {
    (
        (ndc_x as f64 + 1.0) * 0.5 * width,
        (1.0 - ndc_y as f64) * 0.5 * height,
    )
}

/// Absolute URL for an asset, honouring `window.__BASE_URL` when the host
/// page sets it.
pub fn asset_url(path: &str) -> String {
    let p = path.trim();
    if p.starts_with("http://") || p.starts_with("https://") || p.starts_with("data:") {
        return p.to_string();
    }
    let base = web_sys::window()
        .and_then(|w| {
            let v = js_sys::Reflect::get(&w, &JsValue::from_str("__BASE_URL")).ok()?;
            v.as_string()
        })
        .unwrap_or_else(|| "/".to_string());
    join_base(&base, p)
}

fn join_base(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{}/{}", base, path.trim_start_matches('/'))
}

/// Fetch a text resource, trying each URL in turn.
pub async fn fetch_text_with_fallbacks(window: &Window, urls: &[&str]) -> Option<String> {
    for url in urls {
        let resp_value =
            match wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url)).await {
                Ok(v) => v,
                Err(_) => continue,
            };
        let resp: web_sys::Response = match resp_value.dyn_into() {
            Ok(r) => r,
            Err(_) => continue,
        };
        if !resp.ok() {
            log::debug!("{url}: HTTP {}", resp.status());
            continue;
        }
        if let Ok(text_promise) = resp.text()
            && let Ok(text_js) = wasm_bindgen_futures::JsFuture::from(text_promise).await
            && let Some(s) = text_js.as_string()
        {
            return Some(s);
        }
    }
    None
}

pub fn get_query_param(search: &str, key: &str) -> Option<String> {
    let s = search.trim_start_matches('?');
    s.split('&').find_map(|pair| {
        let mut it = pair.splitn(2, '=');
        let k = it.next()?;
        (k == key).then(|| url_decode(it.next().unwrap_or("")))
    })
}

/// Console log level from `?log=`, `info` when absent or unknown.
pub fn log_level(search: &str) -> log::Level {
    get_query_param(search, "log")
        .and_then(|l| l.parse().ok())
        .unwrap_or(log::Level::Info)
}

fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_encoding::percent_decode_str(&s)
        .decode_utf8_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_lookup() {
        let q = "?config=heavy%20card&log=debug";
        assert_eq!(get_query_param(q, "config").as_deref(), Some("heavy card"));
        assert_eq!(get_query_param(q, "log").as_deref(), Some("debug"));
        assert_eq!(get_query_param(q, "missing"), None);
        assert_eq!(get_query_param("?flag", "flag").as_deref(), Some(""));
    }

    #[test]
    fn log_level_from_query() {
        assert_eq!(log_level("?log=debug"), log::Level::Debug);
        assert_eq!(log_level("?config=x&log=WARN"), log::Level::Warn);
        assert_eq!(log_level("?log=loud"), log::Level::Info);
        assert_eq!(log_level(""), log::Level::Info);
    }

    #[test]
    fn ndc_round_trip_through_canvas_pixels() {
        let ndc = client_to_ndc(150.0, 50.0, 100.0, 0.0, 200.0, 100.0);
        assert_eq!(ndc, [-0.5, 0.0]);
        let (x, y) = ndc_to_canvas(ndc[0], ndc[1], 400.0, 200.0);
        assert_eq!((x, y), (100.0, 100.0));
        assert_eq!(client_to_ndc(0.0, 0.0, 0.0, 0.0, 10.0, 10.0), [-1.0, 1.0]);
    }

    #[test]
    fn base_join() {
        assert_eq!(join_base("/", "lanyard/a.json"), "/lanyard/a.json");
        assert_eq!(join_base("/site/", "/lanyard/a.json"), "/site/lanyard/a.json");
        assert_eq!(join_base("/site", "x.png"), "/site/x.png");
    }
}
