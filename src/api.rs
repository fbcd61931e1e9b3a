/// HTTP transport for the streaming completions endpoint
use js_sys::{Reflect, Uint8Array};
use log::{debug, error, info, warn};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, DomException, Headers, ReadableStreamDefaultReader, Request, RequestInit, Response};

use crate::assembler::{DEFAULT_THROTTLE_MS, Finish, RenderFrame, StreamAssembler, StreamOutcome};
use crate::settings::{COMPLETIONS_URL, ChatRequest};
use crate::sse::SseDecoder;

const GENERIC_FAILURE: &str = "Request failed. Please try again later.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Please first set your API key in extension popup.")]
    MissingApiKey,
    #[error("{}", status_message(*.0))]
    Status(u16),
    #[error("Request failed. Please try again later.")]
    Network(String),
    #[error("Request failed. Please try again later.")]
    Body(String),
}

/// What the user sees for an HTTP error status
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Request body format error, please check and modify.",
        401 => "API key error, authentication failed.",
        402 => "Insufficient account balance, please recharge.",
        422 => "Request body parameter error, please check and modify.",
        429 => "Request rate limit reached, please try again later.",
        500 => "Internal server error, please try again later.",
        503 => "Server overload, please try again later.",
        _ => GENERIC_FAILURE,
    }
}

fn js_error(err: JsValue) -> ApiError {
    ApiError::Network(format!("{:?}", err))
}

fn is_abort(err: &JsValue) -> bool {
    err.dyn_ref::<DomException>()
        .map(|e| e.name() == "AbortError")
        .unwrap_or(false)
}

async fn fetch(request: &Request) -> Result<JsValue, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    JsFuture::from(window.fetch_with_request(request)).await
}

/// POST the request and feed the body through the decoder and assembler.
///
/// `on_frame` sees throttled snapshots plus one final flush. An abort is
/// not an error: the outcome is `Cancelled` and keeps the partial answer.
pub async fn stream_completion<F>(
    request: &ChatRequest,
    api_key: &str,
    signal: &AbortSignal,
    include_reasoning: bool,
    mut on_frame: F,
) -> Result<StreamOutcome, ApiError>
where
    F: FnMut(RenderFrame),
{
    if api_key.trim().is_empty() {
        return Err(ApiError::MissingApiKey);
    }

    let body = serde_json::to_string(request).map_err(|e| ApiError::Body(e.to_string()))?;
    debug!("Request body: {}", body);

    let headers = Headers::new().map_err(js_error)?;
    headers.set("Content-Type", "application/json").map_err(js_error)?;
    headers
        .set("Authorization", &format!("Bearer {}", api_key))
        .map_err(js_error)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));
    init.set_signal(Some(signal));

    let http_request = Request::new_with_str_and_init(COMPLETIONS_URL, &init).map_err(js_error)?;
    let mut assembler = StreamAssembler::new(include_reasoning, DEFAULT_THROTTLE_MS);

    let response: Response = match fetch(&http_request).await {
        Ok(value) => value.dyn_into().map_err(js_error)?,
        Err(e) if is_abort(&e) => {
            info!("Request aborted before the response arrived");
            return Ok(assembler.finish(Finish::Cancelled));
        }
        Err(e) => return Err(js_error(e)),
    };

    if !response.ok() {
        warn!("Completion request failed with status {}", response.status());
        return Err(ApiError::Status(response.status()));
    }

    let stream = response
        .body()
        .ok_or_else(|| ApiError::Body("response has no body".to_string()))?;
    let reader: ReadableStreamDefaultReader = stream.get_reader().dyn_into().map_err(|e| js_error(e.into()))?;

    let mut decoder = SseDecoder::new();
    let finish = loop {
        let chunk = match JsFuture::from(reader.read()).await {
            Ok(chunk) => chunk,
            Err(e) if is_abort(&e) => {
                info!("Request aborted, keeping generated content");
                break Finish::Cancelled;
            }
            Err(e) => return Err(js_error(e)),
        };

        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(false);
        if done {
            for event in decoder.finish() {
                assembler.apply(event);
            }
            break Finish::Completed;
        }

        let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(js_error)?;
        let bytes = Uint8Array::new(&value).to_vec();
        for event in decoder.push(&bytes) {
            assembler.apply(event);
        }

        if let Some(frame) = assembler.poll_frame(js_sys::Date::now()) {
            on_frame(frame);
        }

        if assembler.is_done() {
            // The server may hold the connection open after [DONE]
            if let Err(e) = JsFuture::from(reader.cancel()).await {
                error!("Failed to cancel the response stream: {:?}", e);
            }
            break Finish::Completed;
        }
    };

    if let Some(frame) = assembler.flush() {
        on_frame(frame);
    }

    Ok(assembler.finish(finish))
}

/// GET a JSON document
pub async fn fetch_json(url: &str) -> Result<serde_json::Value, ApiError> {
    let init = RequestInit::new();
    init.set_method("GET");

    let request = Request::new_with_str_and_init(url, &init).map_err(js_error)?;
    let response: Response = fetch(&request).await.map_err(js_error)?.dyn_into().map_err(js_error)?;

    if !response.ok() {
        return Err(ApiError::Status(response.status()));
    }

    let json = JsFuture::from(response.json().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    serde_wasm_bindgen::from_value(json).map_err(|e| ApiError::Body(e.to_string()))
}
