pub mod align;
pub mod baseline;
pub mod benchmark;
pub mod loader;
pub mod preprocess;
pub mod registry;
pub mod reporting;
pub mod schedule;
pub mod task;
pub mod trainer;

pub use align::*;
pub use baseline::*;
pub use benchmark::*;
pub use loader::*;
pub use preprocess::*;
pub use registry::*;
pub use reporting::*;
pub use schedule::*;
pub use task::*;
pub use trainer::*;
