/// Floating chat popup: drives the streaming request and renders the turns

use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{AbortController, AbortSignal, Element, MutationObserver, MutationObserverInit, ResizeObserver};
use yew::prelude::*;

use crate::api::{self, ApiError};
use crate::assembler::{RenderFrame, StreamOutcome};
use crate::chrome;
use crate::conversation::Conversation;
use crate::layout::{DEFAULT_HEIGHT, DEFAULT_WIDTH, DragState, Position, ResizeState, clamp_size, popup_style};
use crate::scroll::{ScrollMetrics, ScrollState, bottom_target};
use crate::session::{ChatAction, ChatSession};
use crate::settings::ChatRequest;
use crate::theme::{DARK_CLASS, page_is_dark};
use crate::ui::answer::TurnView;
use crate::ui::input::InputBox;

#[derive(Properties, PartialEq)]
pub struct ChatPopupProps {
    /// First question, sent as soon as the popup mounts
    pub initial_text: String,
    /// False when the first question is a greeting rather than a selection
    #[prop_or(true)]
    pub show_question: bool,
    pub position: Position,
    pub on_close: Callback<()>,
}

type AbortSlot = Rc<RefCell<Option<AbortController>>>;

const RESIZE_HANDLE_STYLE: &str =
    "position: absolute; right: 0; bottom: 0; width: 14px; height: 14px; cursor: nwse-resize;";

fn metrics_of(element: &Element) -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: element.scroll_top() as f64,
        scroll_height: element.scroll_height() as f64,
        client_height: element.client_height() as f64,
    }
}

async fn complete<F>(
    conversation: &RefCell<Conversation>,
    signal: &AbortSignal,
    on_frame: F,
) -> Result<StreamOutcome, ApiError>
where
    F: FnMut(RenderFrame),
{
    let settings = chrome::request_settings().await.map_err(ApiError::Network)?;
    if !settings.has_api_key() {
        return Err(ApiError::MissingApiKey);
    }

    let (model, messages) = {
        let conversation = conversation.borrow();
        let question = conversation.pending_question().unwrap_or_default();
        (
            settings.model_for(question),
            conversation.request_messages(&settings.language),
        )
    };
    info!("Asking {} with {} messages", model.api_id(), messages.len());

    let request = ChatRequest::new(model, messages);
    api::stream_completion(
        &request,
        &settings.api_key,
        signal,
        model.streams_reasoning(),
        on_frame,
    )
    .await
}

/// Start a request for the conversation's pending question.
/// The abort slot doubles as the in-flight marker.
fn run_completion(
    dispatcher: UseReducerDispatcher<ChatSession>,
    conversation: Rc<RefCell<Conversation>>,
    abort: AbortSlot,
) {
    let controller = match AbortController::new() {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to create AbortController: {:?}", e);
            dispatcher.dispatch(ChatAction::Fail(ApiError::Network(format!("{:?}", e))));
            return;
        }
    };
    let signal = controller.signal();
    *abort.borrow_mut() = Some(controller);

    spawn_local(async move {
        let frames = dispatcher.clone();
        let result = complete(&conversation, &signal, move |frame| {
            frames.dispatch(ChatAction::Frame(frame))
        })
        .await;
        abort.borrow_mut().take();

        match result {
            Ok(outcome) => {
                conversation.borrow_mut().push_assistant(outcome.content.clone());
                dispatcher.dispatch(ChatAction::Finish(outcome));
            }
            Err(e) => {
                error!("Completion failed: {:?}", e);
                dispatcher.dispatch(ChatAction::Fail(e));
            }
        }
    });
}

fn abort_in_flight(abort: &AbortSlot) {
    if let Some(controller) = abort.borrow().as_ref() {
        controller.abort();
    }
}

#[function_component(ChatPopup)]
pub fn chat_popup(props: &ChatPopupProps) -> Html {
    let session = use_reducer(ChatSession::new);
    let conversation = use_mut_ref(Conversation::new);
    let abort: AbortSlot = use_mut_ref(|| None);
    let scroll = use_mut_ref(ScrollState::new);
    let generating = use_mut_ref(|| false);
    let drag = use_mut_ref(|| None::<DragState>);
    let resize = use_mut_ref(|| None::<ResizeState>);
    let position = use_state(|| props.position);
    let size = use_state(|| clamp_size(DEFAULT_WIDTH, DEFAULT_HEIGHT));
    let dark = use_state(page_is_dark);
    let popup_ref = use_node_ref();
    let container_ref = use_node_ref();

    *generating.borrow_mut() = session.generating;

    let ask = {
        let dispatcher = session.dispatcher();
        let conversation = conversation.clone();
        let abort = abort.clone();
        let scroll = scroll.clone();
        Callback::from(move |(text, show_question): (String, bool)| {
            if abort.borrow().is_some() || text.trim().is_empty() {
                return;
            }
            conversation.borrow_mut().push_user(text.clone());
            scroll.borrow_mut().reset();
            dispatcher.dispatch(ChatAction::Ask { text, show_question });
            run_completion(dispatcher.clone(), conversation.clone(), abort.clone());
        })
    };

    // First question
    {
        let ask = ask.clone();
        let text = props.initial_text.clone();
        let show_question = props.show_question;
        use_effect_with((), move |_| {
            ask.emit((text, show_question));
            || ()
        });
    }

    // Follow the page theme
    {
        let dark = dark.clone();
        use_effect_with((), move |_| {
            let callback = Closure::wrap(Box::new(move |_: js_sys::Array, _: MutationObserver| {
                dark.set(page_is_dark());
            }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

            let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).ok();
            if let (Some(observer), Some(document)) = (&observer, web_sys::window().and_then(|w| w.document())) {
                let init = MutationObserverInit::new();
                init.set_attributes(true);
                let filter = js_sys::Array::of2(&JsValue::from_str("style"), &JsValue::from_str("class"));
                init.set_attribute_filter(&filter);

                let targets = [document.document_element(), document.body().map(Into::into)];
                for target in targets.into_iter().flatten() {
                    if let Err(e) = observer.observe_with_options(&target, &init) {
                        error!("Failed to observe theme changes: {:?}", e);
                    }
                }
            }

            move || {
                if let Some(observer) = observer {
                    observer.disconnect();
                }
                drop(callback);
            }
        });
    }

    // Dragging by the header and resizing from the corner
    {
        let drag = drag.clone();
        let resize = resize.clone();
        let position = position.clone();
        let size = size.clone();
        use_effect_with((), move |_| {
            let document = web_sys::window().and_then(|w| w.document());

            let on_move = {
                let drag = drag.clone();
                let resize = resize.clone();
                Closure::wrap(Box::new(move |e: MouseEvent| {
                    let (x, y) = (e.page_x() as f64, e.page_y() as f64);
                    if let Some(state) = *drag.borrow() {
                        e.prevent_default();
                        position.set(state.position_for(x, y));
                    } else if let Some(state) = *resize.borrow() {
                        e.prevent_default();
                        size.set(state.size_for(x, y));
                    }
                }) as Box<dyn FnMut(MouseEvent)>)
            };
            let on_up = Closure::wrap(Box::new(move |_: MouseEvent| {
                drag.borrow_mut().take();
                resize.borrow_mut().take();
            }) as Box<dyn FnMut(MouseEvent)>);

            let listeners = [("mousemove", on_move), ("mouseup", on_up)];
            if let Some(document) = &document {
                for (event, listener) in &listeners {
                    if let Err(e) = document.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
                        error!("Failed to listen for {}: {:?}", event, e);
                    }
                }
            }

            move || {
                if let Some(document) = &document {
                    for (event, listener) in &listeners {
                        if let Err(e) = document.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
                            error!("Failed to remove {} listener: {:?}", event, e);
                        }
                    }
                }
            }
        });
    }

    // Keep the reading position across user resizes
    {
        let popup_ref = popup_ref.clone();
        let container_ref = container_ref.clone();
        let scroll = scroll.clone();
        let generating = generating.clone();
        use_effect_with((), move |_| {
            let callback = Closure::wrap(Box::new(move |_: js_sys::Array| {
                if let Some(container) = container_ref.cast::<Element>() {
                    let target = scroll
                        .borrow()
                        .restore_target(metrics_of(&container), *generating.borrow());
                    container.set_scroll_top(target as i32);
                }
            }) as Box<dyn FnMut(js_sys::Array)>);

            let observer = ResizeObserver::new(callback.as_ref().unchecked_ref()).ok();
            if let (Some(observer), Some(popup)) = (&observer, popup_ref.cast::<Element>()) {
                observer.observe(&popup);
            }

            move || {
                if let Some(observer) = observer {
                    observer.disconnect();
                }
                drop(callback);
            }
        });
    }

    // Follow the answer while it streams unless the user scrolled away
    {
        let container_ref = container_ref.clone();
        let scroll = scroll.clone();
        use_effect_with((*session).clone(), move |_| {
            if let Some(container) = container_ref.cast::<Element>() {
                let mut state = scroll.borrow_mut();
                state.settle(js_sys::Date::now());
                if state.allow_auto_scroll() && !state.is_manual_scrolling() {
                    container.set_scroll_top(bottom_target(metrics_of(&container)) as i32);
                }
            }
            || ()
        });
    }

    let on_wheel = {
        let scroll = scroll.clone();
        let container_ref = container_ref.clone();
        Callback::from(move |_: WheelEvent| {
            if let Some(container) = container_ref.cast::<Element>() {
                scroll
                    .borrow_mut()
                    .on_user_scroll(metrics_of(&container), js_sys::Date::now());
            }
        })
    };

    let on_scroll = {
        let scroll = scroll.clone();
        let container_ref = container_ref.clone();
        Callback::from(move |_: Event| {
            if let Some(container) = container_ref.cast::<Element>() {
                let metrics = metrics_of(&container);
                let mut state = scroll.borrow_mut();
                state.save_position(metrics, js_sys::Date::now());
                state.update_allow_auto_scroll(metrics);
            }
        })
    };

    let on_drag_start = {
        let drag = drag.clone();
        let position = position.clone();
        Callback::from(move |e: MouseEvent| {
            if e.button() != 0 {
                return;
            }
            let on_button = e
                .target_dyn_into::<Element>()
                .and_then(|target| target.closest("button").ok().flatten())
                .is_some();
            if on_button {
                return;
            }
            e.prevent_default();
            *drag.borrow_mut() = Some(DragState::start(e.page_x() as f64, e.page_y() as f64, *position));
        })
    };

    let on_resize_start = {
        let resize = resize.clone();
        let size = size.clone();
        Callback::from(move |e: MouseEvent| {
            if e.button() != 0 {
                return;
            }
            e.prevent_default();
            e.stop_propagation();
            let (width, height) = *size;
            *resize.borrow_mut() = Some(ResizeState::start(e.page_x() as f64, e.page_y() as f64, width, height));
        })
    };

    let on_send = {
        let ask = ask.clone();
        Callback::from(move |text: String| ask.emit((text, true)))
    };

    let on_stop = {
        let abort = abort.clone();
        Callback::from(move |_: ()| abort_in_flight(&abort))
    };

    let on_regenerate = {
        let dispatcher = session.dispatcher();
        let conversation = conversation.clone();
        let abort = abort.clone();
        Callback::from(move |_: ()| {
            if abort.borrow().is_some() {
                return;
            }
            if !conversation.borrow_mut().prepare_regenerate() {
                return;
            }
            dispatcher.dispatch(ChatAction::Regenerate);
            run_completion(dispatcher.clone(), conversation.clone(), abort.clone());
        })
    };

    let on_close = {
        let abort = abort.clone();
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| {
            abort_in_flight(&abort);
            on_close.emit(());
        })
    };

    let (width, height) = *size;
    let style = popup_style(*position, width, height);

    let last = session.turns.len().saturating_sub(1);

    html! {
        <div ref={popup_ref} id="ai-popup" class={classes!("ai-popup", (*dark).then_some(DARK_CLASS))} style={style}>
            <div class="drag-handle" onmousedown={on_drag_start}>
                <span class="popup-title">{"DeepSeek AI"}</span>
                <button class="close-button" title="Close" onclick={on_close}>{"×"}</button>
            </div>
            <div
                ref={container_ref}
                class="ai-content-container"
                onwheel={on_wheel}
                onscroll={on_scroll}
            >
                { for session.turns.iter().enumerate().map(|(index, turn)| html! {
                    <TurnView
                        key={turn.id.to_string()}
                        turn={turn.clone()}
                        is_last={index == last}
                        generating={session.generating}
                        on_regenerate={on_regenerate.clone()}
                    />
                }) }
            </div>
            <InputBox generating={session.generating} on_send={on_send} on_stop={on_stop} />
            <div class="resize-handle" title="Resize" style={RESIZE_HANDLE_STYLE} onmousedown={on_resize_start}></div>
        </div>
    }
}
