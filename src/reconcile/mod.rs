// Rules shared by every pull stage: upsert by natural key, stint sequencing and
// materializing parent rows before children.

pub mod prerequisite;
pub mod sequence;
pub mod upsert;

pub use prerequisite::{ensure_parent_exists, Materialized, Parent};
pub use sequence::{derive_active_flags, resolve_sequence, SequenceDisambiguator};
pub use upsert::{reconcile, reconcile_record, Outcome};
