mod invoke_error;

pub use invoke_error::{InvokeError, InvokeErrorKind};
