use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;
use zoon::start_app;

use super::{WidgetRegistry, environment, host_view};
use crate::diagnostics::Diagnostics;
use crate::protocol::MissingRootError;
use crate::runtime::{MOUNT_ID, Runtime, ServerSideData};

pub const SERVER_SIDE_DATA_KEY: &str = "__serverSideData__";
/// Page scripts push component registration callbacks here. Each one is called
/// with `window.customElements`.
pub const COMPONENT_REGISTERS_KEY: &str = "__branVueComponentRegisters";

/// Reads `window.__serverSideData__`; anything unreadable counts as empty.
pub fn read_server_side_data(diagnostics: &Diagnostics) -> ServerSideData {
    let Some(window) = web_sys::window() else {
        return ServerSideData::default();
    };
    let value = match js_sys::Reflect::get(&window, &JsValue::from_str(SERVER_SIDE_DATA_KEY)) {
        Ok(value) if !value.is_undefined() && !value.is_null() => value,
        _ => return ServerSideData::default(),
    };
    let json = match js_sys::JSON::stringify(&value) {
        Ok(json) => String::from(json),
        Err(error) => {
            diagnostics.warn(format!("{SERVER_SIDE_DATA_KEY} is not serializable: {error:?}"));
            return ServerSideData::default();
        }
    };
    serde_json::from_str(&json).unwrap_or_else(|error| {
        diagnostics.warn(format!("{SERVER_SIDE_DATA_KEY} ignored: {error}"));
        ServerSideData::default()
    })
}

/// Calls every registered callback once. Returns how many ran.
pub fn run_component_registers(diagnostics: &Diagnostics) -> usize {
    let Some(window) = web_sys::window() else {
        return 0;
    };
    let handle: JsValue = window.custom_elements().into();
    let Ok(registers) = js_sys::Reflect::get(&window, &JsValue::from_str(COMPONENT_REGISTERS_KEY))
    else {
        return 0;
    };
    let Some(registers) = registers.dyn_ref::<js_sys::Array>() else {
        return 0;
    };
    let mut ran = 0;
    for register in registers.iter() {
        match register.dyn_ref::<js_sys::Function>() {
            Some(register) => match register.call1(&JsValue::UNDEFINED, &handle) {
                Ok(_) => ran += 1,
                Err(error) => diagnostics.error(format!("component register failed: {error:?}")),
            },
            None => diagnostics.warn(format!("{COMPONENT_REGISTERS_KEY} holds a non-function")),
        }
    }
    ran
}

/// Mounts the markup rendered into `root_element` as the first schema. The
/// server-rendered DOM is cleared only after a successful mount.
fn mount_root(root_element: &Element, runtime: &Runtime) -> bool {
    match runtime.mount(&root_element.inner_html()) {
        Ok(()) => {
            root_element.set_inner_html("");
            true
        }
        // Reported by the host.
        Err(_) => false,
    }
}

/// Starts the page: seeds the store, takes the markup rendered into the mount
/// point as the first schema, runs component registers and starts zoon.
///
/// `__serverSideData__` is read before the root lookup because it may carry
/// the mount id. When the first schema does not mount, zoon is not started
/// and the server-rendered page stays as it is.
pub fn boot(widgets: WidgetRegistry) -> Result<(), MissingRootError> {
    let diagnostics = Diagnostics::new();
    let data = read_server_side_data(&diagnostics);
    let mount_id = data
        .config
        .as_ref()
        .map_or_else(|| MOUNT_ID.to_owned(), |config| config.mount_id.clone());

    let root_element = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(&mount_id))
        .ok_or_else(|| MissingRootError {
            id: mount_id.clone(),
        })?;

    run_component_registers(&diagnostics);

    let runtime = Runtime::with_diagnostics(environment(&diagnostics), data, diagnostics);
    if !mount_root(&root_element, &runtime) {
        return Ok(());
    }

    let root = runtime.root().clone();
    let widgets = Rc::new(widgets);
    start_app(mount_id.as_str(), move || host_view(root, widgets));
    Ok(())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryPlatform;
    use wasm_bindgen_test::wasm_bindgen_test;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    fn rendered(markup: &str) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let element = document.create_element("div").unwrap();
        element.set_inner_html(markup);
        element
    }

    #[wasm_bindgen_test]
    fn broken_first_schema_leaves_the_page_alone() {
        let platform = MemoryPlatform::new();
        let runtime = Runtime::new(platform.environment(), ServerSideData::default());
        let element = rendered(r#"<button @click="alert(1)">kept</button>"#);
        let markup = element.inner_html();
        assert!(!mount_root(&element, &runtime));
        assert_eq!(element.inner_html(), markup);
        assert!(runtime.root().current().is_none());
        assert_eq!(runtime.diagnostics().errors().len(), 1);
    }

    #[wasm_bindgen_test]
    fn mounted_first_schema_clears_the_server_markup() {
        let platform = MemoryPlatform::new();
        let runtime = Runtime::new(platform.environment(), ServerSideData::default());
        let element = rendered("<p>hello</p>");
        assert!(mount_root(&element, &runtime));
        assert_eq!(element.inner_html(), "");
        assert_eq!(runtime.root().render_html(), "<p>hello</p>");
    }
}
