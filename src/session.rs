/// View model of one popup: the visible turns and whether a request is running
use std::rc::Rc;

use uuid::Uuid;
use yew::Reducible;

use crate::api::ApiError;
use crate::assembler::{Finish, RenderFrame, StreamOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerStatus {
    Waiting,
    Streaming,
    Done,
    Cancelled,
    Failed(String),
    NeedsApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub content: String,
    pub reasoning: String,
    pub status: AnswerStatus,
}

impl Answer {
    fn waiting() -> Self {
        Answer {
            content: String::new(),
            reasoning: String::new(),
            status: AnswerStatus::Waiting,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.status, AnswerStatus::Waiting | AnswerStatus::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: Uuid,
    /// None when the popup opened with a greeting instead of a selection
    pub question: Option<String>,
    pub answer: Answer,
}

pub enum ChatAction {
    Ask { text: String, show_question: bool },
    Regenerate,
    Frame(RenderFrame),
    Finish(StreamOutcome),
    Fail(ApiError),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatSession {
    pub turns: Vec<Turn>,
    pub generating: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        ChatSession {
            turns: Vec::new(),
            generating: false,
        }
    }

    pub fn last_answer(&self) -> Option<&Answer> {
        self.turns.last().map(|turn| &turn.answer)
    }

    /// Apply one action; returns false when it was ignored
    pub fn apply(&mut self, action: ChatAction) -> bool {
        match action {
            ChatAction::Ask { text, show_question } => {
                if self.generating || text.trim().is_empty() {
                    return false;
                }
                self.turns.push(Turn {
                    id: Uuid::new_v4(),
                    question: show_question.then_some(text),
                    answer: Answer::waiting(),
                });
                self.generating = true;
            }
            ChatAction::Regenerate => {
                if self.generating {
                    return false;
                }
                let Some(turn) = self.turns.last_mut() else {
                    return false;
                };
                turn.answer = Answer::waiting();
                self.generating = true;
            }
            ChatAction::Frame(frame) => {
                let Some(answer) = self.active_answer() else {
                    return false;
                };
                answer.content = frame.content;
                answer.reasoning = frame.reasoning;
                answer.status = AnswerStatus::Streaming;
            }
            ChatAction::Finish(outcome) => {
                let Some(answer) = self.active_answer() else {
                    return false;
                };
                answer.content = outcome.content;
                answer.reasoning = outcome.reasoning;
                answer.status = match outcome.finish {
                    Finish::Completed => AnswerStatus::Done,
                    Finish::Cancelled => AnswerStatus::Cancelled,
                };
                self.generating = false;
            }
            ChatAction::Fail(err) => {
                let Some(answer) = self.active_answer() else {
                    return false;
                };
                answer.status = match err {
                    ApiError::MissingApiKey => AnswerStatus::NeedsApiKey,
                    other => AnswerStatus::Failed(other.to_string()),
                };
                answer.content.clear();
                answer.reasoning.clear();
                self.generating = false;
            }
        }
        true
    }

    fn active_answer(&mut self) -> Option<&mut Answer> {
        if !self.generating {
            return None;
        }
        self.turns.last_mut().map(|turn| &mut turn.answer)
    }
}

impl Reducible for ChatSession {
    type Action = ChatAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        if next.apply(action) { Rc::new(next) } else { self }
    }
}
