//! Interactive feedback form.
//!
//! [`FeedbackController`] holds the form state and talks to the classifier and
//! correction log; [`FeedbackApp`] draws it with egui.

pub mod controller;
pub mod ui;

pub use controller::{FeedbackController, StatusKind, StatusLine, DESCRIPTION, EXAMPLES, TITLE};
pub use ui::{FeedbackApp, LaunchError, MIN_VIEWPORT_SIZE};
