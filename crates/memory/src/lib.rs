pub mod analysis;
pub mod types;
pub mod vault;

pub use analysis::{analyze_emotion, calculate_importance, extract_tags};
pub use types::*;
pub use vault::{MemoryError, MemoryVault, DEFAULT_USER};
