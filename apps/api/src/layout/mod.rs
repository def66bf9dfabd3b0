// Block layout core: height resolution, per-cell fit validation, editor normalization.
// Everything under this module is pure and synchronous: no I/O, no shared state.

pub mod editor;
pub mod fit;
pub mod model;
pub mod policy;
pub mod resolver;

// Re-export the public API consumed by the routes and by library callers.
pub use editor::{
    check_publish_validity, normalize_block, validate_block_for_editor,
    validate_blocks_for_editor, EditorBlock, EditorCell,
};
pub use model::*;
pub use policy::{LayoutPolicy, PolicyError, DEFAULT_POLICY};
pub use resolver::resolve;
