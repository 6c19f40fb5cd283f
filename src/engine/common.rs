// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::ConvertError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run a codec closure under the global panic policy.
///
/// Native codecs (mozjpeg in particular) can abort on malformed input paths
/// that their Result surface does not cover. A panic crossing the pipeline
/// boundary would poison the conversion gate, so every codec call is wrapped
/// here and surfaces as `InternalPanic` instead.
pub fn run_with_panic_policy<T>(
    stage: &'static str,
    f: impl FnOnce() -> Result<T, ConvertError>,
) -> Result<T, ConvertError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            tracing::error!(stage, detail = %detail, "codec panicked");
            Err(ConvertError::internal_panic(format!(
                "panic in {stage}: {detail}"
            )))
        }
    }
}
