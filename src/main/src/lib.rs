//! Flow temperature from a heating curve, recomputed whenever an installation's
//! sensors or parameters change.

pub mod config;
pub mod error;
pub mod flow;
pub mod installation;
pub mod publish;
pub mod sensor;
pub mod store;

pub use error::{Error, Result};
