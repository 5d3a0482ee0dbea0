use futures_util::future::LocalBoxFuture;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{BlobPropertyBag, FormData, RequestInit, Response};

use crate::protocol::{Blob, EventRequest, FormField, RawResponse, TransportError};
use crate::runtime::Transport;

/// `fetch` with a multipart body, one form field per store entry.
pub struct FetchTransport;

impl Transport for FetchTransport {
    fn post(&self, request: EventRequest) -> LocalBoxFuture<'static, Result<RawResponse, TransportError>> {
        Box::pin(async move { post(request).await.map_err(network_error) })
    }
}

async fn post(request: EventRequest) -> Result<RawResponse, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let body = form_data(&request)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&body);

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(&request.url, &init))
        .await?
        .dyn_into()?;
    let status = response.status();
    let text = JsFuture::from(response.text()?).await?;
    Ok(RawResponse {
        status,
        body: text.as_string().unwrap_or_default(),
    })
}

fn form_data(request: &EventRequest) -> Result<FormData, JsValue> {
    let form_data = FormData::new()?;
    for (name, field) in &request.body {
        match field {
            FormField::Text(text) => form_data.append_with_str(name, text)?,
            FormField::Blob(blob) => {
                let js_blob = js_blob(blob)?;
                match &blob.file_name {
                    Some(file_name) => {
                        form_data.append_with_blob_and_filename(name, &js_blob, file_name)?
                    }
                    None => form_data.append_with_blob(name, &js_blob)?,
                }
            }
        }
    }
    Ok(form_data)
}

fn js_blob(blob: &Blob) -> Result<web_sys::Blob, JsValue> {
    let bytes = js_sys::Uint8Array::from(&blob.bytes[..]);
    let parts = js_sys::Array::of1(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type(&blob.content_type);
    web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

fn network_error(error: JsValue) -> TransportError {
    TransportError::Network(
        error
            .as_string()
            .or_else(|| js_sys::JSON::stringify(&error).ok().and_then(|text| text.as_string()))
            .unwrap_or_else(|| format!("{error:?}")),
    )
}
