mod backup;
pub mod builder;
pub mod connection;
pub mod dialect;
pub mod sql;
pub mod traits;
pub mod value;

pub use connection::*;
pub use dialect::*;
pub use sql::*;
pub use traits::*;
pub use value::Record;
