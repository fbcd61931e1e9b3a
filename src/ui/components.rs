/// Reusable UI components

use yew::prelude::*;

/// Shown while waiting for the first token
#[function_component(Spinner)]
pub fn spinner() -> Html {
    html! {
        <div class="loading-container" aria-label="Loading">
            <div class="loading-dots">
                <span></span><span></span><span></span>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct IconButtonProps {
    pub onclick: Callback<MouseEvent>,
    pub title: AttrValue,
    pub children: Children,
    #[prop_or(false)]
    pub disabled: bool,
    #[prop_or_default]
    pub variant: IconVariant,
}

#[derive(PartialEq, Clone, Default)]
pub enum IconVariant {
    #[default]
    Plain,
    Accent,
}

#[function_component(IconButton)]
pub fn icon_button(props: &IconButtonProps) -> Html {
    let variant = match props.variant {
        IconVariant::Plain => "icon-button",
        IconVariant::Accent => "icon-button accent",
    };
    let class = classes!(variant, props.disabled.then_some("disabled"));

    html! {
        <button
            class={class}
            title={props.title.clone()}
            onclick={props.onclick.clone()}
            disabled={props.disabled}
        >
            {props.children.clone()}
        </button>
    }
}

#[derive(Properties, PartialEq)]
pub struct NoticeProps {
    pub message: String,
    #[prop_or_default]
    pub kind: NoticeKind,
    #[prop_or_default]
    pub onclick: Option<Callback<MouseEvent>>,
}

#[derive(PartialEq, Clone, Default)]
pub enum NoticeKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// One-line status shown in place of an answer
#[function_component(Notice)]
pub fn notice(props: &NoticeProps) -> Html {
    let (bg_color, border_color) = match props.kind {
        NoticeKind::Info => ("var(--notice-info-bg)", "#2196f3"),
        NoticeKind::Warning => ("var(--notice-warning-bg)", "#ff9800"),
        NoticeKind::Error => ("var(--notice-error-bg)", "#f44336"),
    };
    let style = format!(
        "padding: 8px 12px; border-radius: 6px; background-color: {}; border-left: 3px solid {};",
        bg_color, border_color
    );

    html! {
        <div class="notice" style={style}>
            if let Some(onclick) = &props.onclick {
                <a href="#" class="notice-link" onclick={onclick.clone()}>{&props.message}</a>
            } else {
                <p class="message-paragraph">{&props.message}</p>
            }
        </div>
    }
}
