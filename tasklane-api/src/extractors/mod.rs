/// Request extractors that reject with [`crate::error::ApiError`]
///
/// Axum's built-in `Json` and `Path` reject with plain-text bodies; these
/// wrappers keep every error response in the JSON error format.
///
/// - `ValidatedJson`: JSON body + `validator` rules
/// - `ApiJson`: JSON body only; the handler validates after authorizing
/// - `ApiPath`: path parameters

pub mod json;
pub mod path;
pub mod validated_json;

pub use json::ApiJson;
pub use path::ApiPath;
pub use validated_json::ValidatedJson;
