//! Helper Sandbox
//!
//! Wraps every helper behind one calling signature ([`TemplateHelper`]) and a
//! failure boundary ([`SandboxedHelper`]). Helpers see their positional
//! arguments and a separate invocation descriptor; block callbacks are present
//! only when the helper was invoked in block form.

pub mod helper_def;
pub mod types;

pub use helper_def::{error_marker, install, install_missing_handler, SandboxedHelper};
pub use types::{
    item_locals, BlockRenderer, CallingConvention, HelperCall, HelperEntry, HelperOutput,
    HelperResult, SafeString, TemplateHelper,
};
