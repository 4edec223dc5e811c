//! Provider implementations, one per instruction kind.

mod ai;
mod manual;
mod openrewrite;

pub use ai::AiProvider;
pub use manual::ManualProvider;
pub use openrewrite::{OpenRewriteProvider, REWRITE_PLUGIN, composite_for, recipe_file_name, rewrite_command};
