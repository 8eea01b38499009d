//! Stable human-readable formats carried in status payloads. Control planes
//! and tests match on these strings, so changing them is a wire break.

pub const SOURCE_FILE_AMBIGUOUS: &str = "Multiple files match the requested path";
pub const SOURCE_FILE_NOT_FOUND: &str =
    "A script matching the source file was not found in the inventory";
pub const UNSUPPORTED_EXTENSION: &str = "Only source files known to the runtime are supported";
pub const INVALID_LINE_NUMBER: &str = "Invalid snapshot position: ";
pub const ERROR_COMPILING_CONDITION: &str = "Error compiling condition.";
pub const ERROR_COMPILING_EXPRESSION: &str = "Error Compiling Expression";
pub const CONDITION_EVALUATION_FAILED: &str = "Error evaluating condition";
pub const EXPRESSION_EVALUATION_FAILED: &str = "Error evaluating expression";
pub const NATIVE_PROPERTY: &str = "Property is native or accessor-backed and was not captured";
pub const ONLY_FIRST_CAPTURED: &str =
    "Only first `$0` items were captured. Use in an expression to see all items";
pub const FRAMES_NOT_EXPANDED: &str =
    "Locals and arguments are only displayed for the top `$0` stack frames";
pub const SNAPSHOT_EXPIRED: &str = "The snapshot has expired";

/// Marker appended to strings cut at `maxStringLength`.
pub const TRUNCATION_MARKER: &str = "...";

/// Fallback frame name when the runtime has no better one.
pub const ANONYMOUS_FUNCTION: &str = "(anonymous function)";
