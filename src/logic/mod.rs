pub mod inputs;
pub mod oracle;
pub mod path_resolver;
pub mod request_parser;

pub use inputs::*;
pub use oracle::*;
pub use path_resolver::*;
pub use request_parser::*;
