pub mod query_options;
pub mod request;

pub use query_options::*;
pub use request::*;
