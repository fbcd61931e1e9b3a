/// UI module exports
pub mod answer;
pub mod components;
pub mod input;
pub mod popup;
