pub mod config;
pub mod error;

pub use config::{PassiveResponderDef, PriscillaConfig};
pub use error::{PriscillaError, Result};
