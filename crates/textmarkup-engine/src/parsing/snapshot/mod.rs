//! # Snapshot Testing Support
//!
//! - **`normalize`**: converts a syntax tree to a stable, serializable
//!   `TreeSnap` with absolute spans, and to an indented text dump for `insta`
//!   snapshots and the CLI.
//! - **`invariants`**: the length invariant check run after every parse in
//!   debug builds.

pub mod invariants;
pub mod normalize;

pub use invariants::check as invariants;
pub use normalize::{TreeSnap, format_tree, normalize};
