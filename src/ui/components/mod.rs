mod choice_picker;
mod command_input;
mod confirm_dialog;
mod filter_input;
mod form;
mod input;
mod key_result;

pub use choice_picker::{ChoicePicker, ChoicePickerEvent};
pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::ConfirmDialog;
pub use filter_input::{FilterInput, FilterInputEvent};
pub use form::{FormEvent, FormOverlay};
pub use key_result::KeyResult;
