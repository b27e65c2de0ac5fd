pub mod runtime;
pub mod text_input;
pub mod theme;
pub mod widget_component;
