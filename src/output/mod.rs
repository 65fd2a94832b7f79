pub mod format;
pub mod terminal;

pub use format::{FormatFault, OpaqueKind, ScriptValue, format_value};
pub use terminal::print_envelope;
