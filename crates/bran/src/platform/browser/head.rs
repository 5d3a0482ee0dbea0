use wasm_bindgen::JsValue;
use web_sys::Document;

use crate::diagnostics::Diagnostics;
use crate::runtime::{HeadSlot, PageHead};

/// `document.title` and the `#main_styles` / `#main_scripts` head slots.
pub struct DocumentHead {
    diagnostics: Diagnostics,
}

impl DocumentHead {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl PageHead for DocumentHead {
    fn set_title(&self, title: &str) {
        if let Some(document) = document() {
            document.set_title(title);
        }
    }

    fn inject(&self, slot: HeadSlot, content: &str) {
        let Some(document) = document() else {
            return;
        };
        if let Err(error) = inject(&document, slot, content) {
            self.diagnostics.error(format!("#{} not updated: {error:?}", slot.element_id()));
        }
    }
}

fn document() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

fn inject(document: &Document, slot: HeadSlot, content: &str) -> Result<(), JsValue> {
    let element = match document.get_element_by_id(slot.element_id()) {
        Some(element) => element,
        None => {
            let element = document.create_element("div")?;
            element.set_id(slot.element_id());
            document
                .head()
                .ok_or_else(|| JsValue::from_str("document has no head"))?
                .append_child(&element)?;
            element
        }
    };
    element.set_inner_html(content);
    Ok(())
}
