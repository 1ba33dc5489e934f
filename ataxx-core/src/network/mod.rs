pub mod connection;

pub use connection::{ClientConnection, Connection, ConnectionInfo, Inbound, ServerConnection};
