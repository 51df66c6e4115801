pub mod transport;

pub use transport::{SocketEnvelope, SocketTransport};
