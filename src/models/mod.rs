pub mod command;
pub mod view;

pub use command::{Action, CommandRequest, CommandResult, Device};
pub use view::{FieldPath, FieldValue, ViewModel};
