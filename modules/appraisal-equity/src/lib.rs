pub mod engine;
pub mod error;
pub mod resolver;

pub use engine::{EquityEngine, DEFAULT_COMPARABLES};
pub use error::{EquityError, ResolveError, Result};
pub use resolver::Resolver;
