//! Outbound side of the transport seam.
//!
//! The controller never awaits the network. It hands [`TransportCommand`]s
//! to a [`Transport`]; request commands are answered later through
//! [`arcade_shared::TransportResponse`] on the runtime's input channel.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

use arcade_shared::TransportCommand;

use crate::error::TransportError;

pub trait Transport: Send {
    fn send(&mut self, command: TransportCommand) -> Result<(), TransportError>;
}

/// Transport backed by a bounded tokio channel drained by the socket task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<TransportCommand>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { tx }
    }

    /// Create a transport and the receiver the socket task reads from.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<TransportCommand>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, command: TransportCommand) -> Result<(), TransportError> {
        trace!(command = ?command, "Queueing transport command");
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_delivers() {
        let (mut transport, mut rx) = ChannelTransport::channel(4);
        transport.send(TransportCommand::RequestOnlineUsers).unwrap();
        assert_eq!(rx.recv().await, Some(TransportCommand::RequestOnlineUsers));
    }

    #[test]
    fn test_channel_transport_errors() {
        let (mut transport, rx) = ChannelTransport::channel(1);
        transport.send(TransportCommand::FetchUnreadCounts).unwrap();
        assert_eq!(
            transport.send(TransportCommand::FetchUnreadCounts),
            Err(TransportError::Full)
        );

        drop(rx);
        assert_eq!(
            transport.send(TransportCommand::FetchUnreadCounts),
            Err(TransportError::Closed)
        );
    }
}
