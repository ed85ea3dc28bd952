pub mod aggregators;
pub mod calculators;
pub mod statistical;

pub use aggregators::*;
pub use calculators::*;
pub use statistical::*;
