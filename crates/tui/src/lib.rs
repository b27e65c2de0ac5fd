//! # Advisory widget
//!
//! Displays and edits a single remote "desktop advisory message" variable.
//!
//! ## Architecture
//!
//! - [`widget::WidgetController`] is the functional core: it consumes
//!   messages and answers with effects, holding all widget state and guards.
//! - [`widget::WidgetDriver`] is the imperative shell: it performs network
//!   effects on Tokio tasks and owns the recurring poll.
//! - [`widget::WidgetView`] projects state for renderers; the terminal UI in
//!   `ui` is one of them, the CLI's one-shot commands are another.

mod ui;
pub mod widget;

use std::sync::Arc;

use advisory_api::VariableApi;
use advisory_types::ConfigSource;
use anyhow::Result;

pub use widget::{WidgetController, WidgetDriver, WidgetError, WidgetView};

/// Runs the interactive widget until the operator quits.
///
/// The widget is active for exactly the lifetime of the screen.
pub async fn run<A: VariableApi + 'static>(api: Arc<A>, source: ConfigSource) -> Result<()> {
    ui::runtime::run_app(WidgetDriver::new(api, source)).await
}
