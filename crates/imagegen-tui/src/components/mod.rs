pub mod log_panel;
pub mod prompt_form;
pub mod result_panel;
