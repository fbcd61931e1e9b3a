/// One question and its streamed answer

use log::error;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::chrome;
use crate::markdown::render_markdown;
use crate::messaging::Request;
use crate::session::{AnswerStatus, Turn};
use crate::ui::components::{IconButton, IconVariant, Notice, NoticeKind, Spinner};

#[derive(Properties, PartialEq)]
pub struct TurnViewProps {
    pub turn: Turn,
    /// Only the newest answer can be regenerated
    pub is_last: bool,
    pub generating: bool,
    pub on_regenerate: Callback<()>,
}

#[derive(Properties, PartialEq)]
struct MarkdownProps {
    source: String,
    class: AttrValue,
}

#[function_component(Markdown)]
fn markdown(props: &MarkdownProps) -> Html {
    let rendered = use_memo(props.source.clone(), |source| render_markdown(source));
    html! {
        <div class={props.class.clone()}>
            {Html::from_html_unchecked(AttrValue::from((*rendered).clone()))}
        </div>
    }
}

fn open_settings() -> Callback<MouseEvent> {
    Callback::from(|e: MouseEvent| {
        e.prevent_default();
        spawn_local(async {
            if let Err(e) = chrome::send_message::<bool>(&Request::OpenPopup).await {
                error!("{}", e);
            }
        });
    })
}

#[function_component(TurnView)]
pub fn turn_view(props: &TurnViewProps) -> Html {
    let reasoning_open = use_state(|| true);
    let answer = &props.turn.answer;

    let toggle_reasoning = {
        let reasoning_open = reasoning_open.clone();
        Callback::from(move |_: MouseEvent| reasoning_open.set(!*reasoning_open))
    };

    let on_copy = {
        let content = answer.content.clone();
        Callback::from(move |_: MouseEvent| {
            let content = content.clone();
            spawn_local(async move {
                if let Err(e) = chrome::copy_to_clipboard(&content).await {
                    error!("{}", e);
                }
            });
        })
    };

    let on_regenerate = {
        let on_regenerate = props.on_regenerate.clone();
        Callback::from(move |_: MouseEvent| on_regenerate.emit(()))
    };

    let body = match &answer.status {
        AnswerStatus::Waiting => html! { <Spinner /> },
        AnswerStatus::NeedsApiKey => html! {
            <Notice
                message={crate::api::ApiError::MissingApiKey.to_string()}
                kind={NoticeKind::Warning}
                onclick={open_settings()}
            />
        },
        AnswerStatus::Failed(message) => html! {
            <Notice message={message.clone()} kind={NoticeKind::Error} />
        },
        _ => html! {
            <Markdown source={answer.content.clone()} class="answer-content" />
        },
    };

    let show_actions = answer.is_settled() && !answer.content.is_empty();
    let can_regenerate = props.is_last && answer.is_settled();

    html! {
        <div class="chat-turn">
            if let Some(question) = &props.turn.question {
                <div class="user-message">
                    <p class="message-paragraph">{question}</p>
                </div>
            }
            <div class="ai-answer">
                if !answer.reasoning.is_empty() {
                    <div class={classes!("reasoning-section", (!*reasoning_open).then_some("collapsed"))}>
                        <div class="reasoning-header" onclick={toggle_reasoning}>
                            <span class="reasoning-title">{"Thinking"}</span>
                            <span class="reasoning-toggle">{ if *reasoning_open { "▾" } else { "▸" } }</span>
                        </div>
                        if *reasoning_open {
                            <Markdown source={answer.reasoning.clone()} class="reasoning-content" />
                        }
                    </div>
                }
                {body}
                if answer.status == AnswerStatus::Cancelled {
                    <Notice message="Generation stopped." kind={NoticeKind::Info} />
                }
                if show_actions || can_regenerate {
                    <div class="answer-actions">
                        if show_actions {
                            <IconButton title="Copy" onclick={on_copy}>
                                {"⧉"}
                            </IconButton>
                        }
                        if can_regenerate {
                            <IconButton
                                title="Regenerate"
                                variant={IconVariant::Accent}
                                disabled={props.generating}
                                onclick={on_regenerate}
                            >
                                {"↻"}
                            </IconButton>
                        }
                    </div>
                }
            </div>
        </div>
    }
}
