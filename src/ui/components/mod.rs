mod command_input;
mod filter_input;
mod input;
mod key_result;
mod location_picker;

pub use command_input::{CommandEvent, CommandInput};
pub use filter_input::{FilterEvent, FilterInput};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use location_picker::{LocationPicker, PickerEvent};
