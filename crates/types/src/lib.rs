//! Shared data model for the advisory message widget: configuration layers,
//! the remote variable, widget state, and the message/effect vocabulary used
//! between the controller and its driver.

mod config;
mod error;
mod variable;
mod widget;

pub use config::{
    Attributes, ConfigSource, Configuration, DEFAULT_CAD_VAR_ID, DEFAULT_DATA_CENTER, InstanceProperties, SettingName,
    normalize_region,
};
pub use error::{ApiError, BODY_EXCERPT_LIMIT};
pub use variable::{PLACEHOLDER, RemoteVariable, VariablePayload, VariableUpdate};
pub use widget::{Effect, FetchTrigger, Msg, RequestId, WidgetState, WidgetStatus};
