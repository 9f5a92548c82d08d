// Realtime layer: socket task, channel lifecycle, presence and typing.

pub mod channels;
pub mod presence;
pub mod socket;
pub mod transport;
pub mod typing;

mod error;

pub use channels::{ChannelRegistry, Subscription};
pub use error::RealtimeError;
pub use presence::PresenceTracker;
pub use socket::{spawn_socket, SocketCommand, SocketConfig, SocketNotification};
pub use transport::{
    MemoryTransport, RealtimeConnection, RealtimeTransport, TransportEvent, TransportEventHandler,
};
pub use typing::TypingCoordinator;
