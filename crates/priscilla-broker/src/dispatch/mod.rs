pub mod actor;
pub mod registry;
pub mod request;

pub use actor::Dispatcher;
pub use registry::ConnectionRegistry;
pub use request::{DispatchRequest, Submitter};
