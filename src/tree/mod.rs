//! Document tree addressing, scanning, and patching.
//!
//! Documents are plain `serde_json::Value` trees. The scanner reports typed
//! [`DocPath`]s, and the patcher consumes the same paths, so a location found
//! during a scan is exactly the location rewritten later.

pub mod patch;
pub mod path;
pub mod scan;

pub use patch::{MutationOp, PatchError};
pub use path::{DocPath, Step};
pub use scan::{EmptyRefFinding, RefFields, TreeScanner, UrlFinding};
