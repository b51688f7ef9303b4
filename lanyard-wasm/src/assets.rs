use std::cell::RefCell;
use std::rc::Rc;

use lanyard_core::{AssetKind, LogObserver};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlImageElement};

use crate::constants::{CARD_BACK_TEXTURE, CARD_FRONT_TEXTURE, ROPE_TEXTURE};
use crate::state::State;
use crate::utils::asset_url;

/// Decoded images, filled in as they arrive.
#[derive(Default)]
pub struct Textures {
    pub rope: Option<HtmlImageElement>,
    pub card_front: Option<HtmlImageElement>,
    pub card_back: Option<HtmlImageElement>,
}

impl Textures {
    pub fn get(&self, kind: AssetKind) -> Option<&HtmlImageElement> {
        match kind {
            AssetKind::Rope => self.rope.as_ref(),
            AssetKind::CardFront => self.card_front.as_ref(),
            AssetKind::CardBack => self.card_back.as_ref(),
        }
    }

    fn slot(&mut self, kind: AssetKind) -> &mut Option<HtmlImageElement> {
        match kind {
            AssetKind::Rope => &mut self.rope,
            AssetKind::CardFront => &mut self.card_front,
            AssetKind::CardBack => &mut self.card_back,
        }
    }
}

fn path_for(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Rope => ROPE_TEXTURE,
        AssetKind::CardFront => CARD_FRONT_TEXTURE,
        AssetKind::CardBack => CARD_BACK_TEXTURE,
    }
}

/// Start loading every texture. Results land in the state when the browser
/// reports them; frames keep running meanwhile.
pub fn load_textures(state: &Rc<RefCell<State>>) -> Result<(), JsValue> {
    for kind in AssetKind::ALL {
        load_texture(state.clone(), kind)?;
    }
    Ok(())
}

fn load_texture(state: Rc<RefCell<State>>, kind: AssetKind) -> Result<(), JsValue> {
    let img = HtmlImageElement::new()?;
    let url = asset_url(path_for(kind));

    let st = state.clone();
    let img_for_closure = img.clone();
    let onload = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_e: Event| {
        let mut s = st.borrow_mut();
        *s.textures.slot(kind) = Some(img_for_closure.clone());
        s.scene.asset_loaded(kind);
    }));

    let st = state;
    let url_for_closure = url.clone();
    let onerror = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_e: Event| {
        let mut s = st.borrow_mut();
        s.scene
            .asset_failed(kind, format!("could not load {url_for_closure}"), &mut LogObserver);
    }));

    img.set_onload(Some(onload.as_ref().unchecked_ref()));
    img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    img.set_src(&url);
    onload.forget();
    onerror.forget();
    Ok(())
}
