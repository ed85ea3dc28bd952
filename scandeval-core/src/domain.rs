pub mod batch;
pub mod config;
pub mod dataset;
pub mod labels;
pub mod model;
pub mod run;
pub mod tokenizer;

pub use batch::*;
pub use config::*;
pub use dataset::*;
pub use labels::*;
pub use model::*;
pub use run::*;
pub use tokenizer::*;
