//! Success and error messages passed to pages through the query string.
//!
//! Form handlers redirect back to a page with either `success=` or `error=`
//! in the query string, and the page renders the message as a banner.

use axum::response::Redirect;
use maud::{Markup, html};
use serde::Deserialize;

/// A message for the user after a form submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback<'a> {
    /// The action completed.
    Success(&'a str),
    /// The action was rejected or failed.
    Error(&'a str),
}

impl Feedback<'_> {
    fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Feedback::Success(message) => ("success", message),
            Feedback::Error(message) => ("error", message),
        }
    }
}

/// The feedback messages read from a page's query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Build `endpoint` with `feedback` encoded in the query string.
pub fn url_with_feedback(endpoint: &str, feedback: Feedback) -> String {
    match serde_urlencoded::to_string([feedback.query_pair()]) {
        Ok(query) => format!("{endpoint}?{query}"),
        Err(error) => {
            tracing::error!("Could not encode feedback {feedback:?}: {error}");
            endpoint.to_owned()
        }
    }
}

/// Redirect the client to `endpoint` with a `303 See Other`, carrying `feedback`.
pub fn redirect_with_feedback(endpoint: &str, feedback: Feedback) -> Redirect {
    Redirect::to(&url_with_feedback(endpoint, feedback))
}

/// Render the banners for any messages in `query`.
pub fn feedback_banner(query: &FeedbackQuery) -> Markup {
    html! {
        @if let Some(message) = query.success.as_deref().filter(|message| !message.is_empty()) {
            div
                role="status"
                class="feedback-success w-full p-4 mb-4 text-sm rounded text-green-800
                    bg-green-50 dark:bg-gray-800 dark:text-green-400"
            {
                (message)
            }
        }

        @if let Some(message) = query.error.as_deref().filter(|message| !message.is_empty()) {
            div
                role="alert"
                class="feedback-error w-full p-4 mb-4 text-sm rounded text-red-800
                    bg-red-50 dark:bg-gray-800 dark:text-red-400"
            {
                (message)
            }
        }
    }
}
