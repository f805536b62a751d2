pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod routes;

pub use dispatcher::*;
pub use handlers::*;
pub use registry::*;
pub use routes::*;
