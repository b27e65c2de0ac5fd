//! The advisory widget: a pure controller, the async driver that performs its
//! effects, and the view projection renderers consume.

pub mod controller;
pub mod driver;
pub mod view;

pub use controller::{EMPTY_MESSAGE_ERROR, WidgetController, WidgetError};
pub use driver::{POLL_INTERVAL, WidgetDriver};
pub use view::{EditSurface, MetadataField, TITLE, WidgetView};
