pub mod connection;
pub mod queries;
pub mod schema;
pub mod store;

pub use connection::*;
pub use queries::*;
pub use schema::*;
pub use store::SurrealStore;
