//! Settings sources.
//!
//! - [`MemorySource`]: programmatic trees
//! - [`FigmentSource`]: YAML files and prefixed environment variables
//! - [`CombinedSource`]: two sources merged into one tree

pub mod combined;
pub mod figment;
pub mod memory;

pub use self::combined::{combine, CombinedSource, MergePolicy};
pub use self::figment::FigmentSource;
pub use self::memory::MemorySource;
