//! Priscilla broker: accepts adapter and responder connections over TCP and
//! routes chat traffic between them.

pub mod conn;
pub mod dispatch;
pub mod invoke;
pub mod logging;
pub mod server;

pub use dispatch::{Dispatcher, Submitter};
pub use invoke::{BrokerInvoker, Invoker};
