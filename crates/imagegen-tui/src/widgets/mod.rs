pub mod form_input;
pub mod pane_chrome;
pub mod status_bar;
pub mod toast;
