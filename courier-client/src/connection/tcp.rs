//! TCP dispatcher connections

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use courier_protocol::{CodecError, DispatcherId, Handshake, Packet, PacketCodec};
use courier_utils::{CourierError, Result};

use super::transport::{ConnectionFactory, DispatcherConnection};
use crate::config::{ConfigHandle, TransportConfig};

fn codec_error(e: CodecError) -> CourierError {
    match e {
        CodecError::Io(io) => CourierError::Io(io),
        other => CourierError::protocol(other.to_string()),
    }
}

/// Dials dispatchers using the addresses in the shared configuration
pub struct TcpConnector {
    config: ConfigHandle,
}

impl TcpConnector {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }
}

impl ConnectionFactory for TcpConnector {
    type Connection = TcpConnection;

    async fn dial(&self, dispatcher_id: DispatcherId) -> Result<TcpConnection> {
        // Read the latest snapshot so reloaded addresses apply on the next dial
        let config = self.config.load_full();
        let entry = config
            .dispatcher(dispatcher_id)
            .ok_or(CourierError::DispatcherNotConfigured(dispatcher_id))?;

        let addr = lookup_host((entry.host.as_str(), entry.port))
            .await
            .map_err(|e| {
                CourierError::connection(format!("Failed to resolve {}: {}", entry.host, e))
            })?
            .next()
            .ok_or_else(|| {
                CourierError::connection(format!("No address found for {}", entry.host))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_recv_buffer_size(config.transport.read_buffer_size)?;
        socket.set_send_buffer_size(config.transport.write_buffer_size)?;

        let stream = socket.connect(addr).await.map_err(|e| {
            CourierError::connection(format!("Failed to connect to {}: {}", addr, e))
        })?;
        stream.set_nodelay(true)?;

        debug!(dispatcher_id, %addr, "TCP connection established");
        TcpConnection::new(stream, &config.transport)
    }
}

/// Framed TCP connection to a dispatcher.
///
/// Outbound packets go through a bounded queue drained by a writer task, so
/// senders never touch the socket directly.
pub struct TcpConnection {
    peer_addr: SocketAddr,
    reader: Mutex<FramedRead<OwnedReadHalf, PacketCodec>>,
    outgoing: mpsc::Sender<Packet>,
    queue_capacity: usize,
    recv_timeout: Duration,
    cancel: CancellationToken,
}

impl TcpConnection {
    /// Wrap a connected stream. Must be called from within a tokio runtime.
    pub fn new(stream: TcpStream, transport: &TransportConfig) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let (outgoing, outgoing_rx) = mpsc::channel(transport.send_queue_capacity);
        let cancel = CancellationToken::new();

        tokio::spawn(Self::writer_task(
            FramedWrite::new(write_half, PacketCodec::new()),
            outgoing_rx,
            cancel.clone(),
            peer_addr,
        ));

        Ok(Self {
            peer_addr,
            reader: Mutex::new(FramedRead::new(read_half, PacketCodec::new())),
            outgoing,
            queue_capacity: transport.send_queue_capacity,
            recv_timeout: transport.recv_timeout(),
            cancel,
        })
    }

    /// Drains the send queue into the socket until cancelled or a write fails
    async fn writer_task(
        mut sink: FramedWrite<OwnedWriteHalf, PacketCodec>,
        mut outgoing: mpsc::Receiver<Packet>,
        cancel: CancellationToken,
        peer_addr: SocketAddr,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let dropped = discard_queued(&mut outgoing);
                    if dropped > 0 {
                        debug!(%peer_addr, dropped, "Dropped queued packets on close");
                    }
                    // Send FIN so the dispatcher sees the close
                    let _ = sink.close().await;
                    break;
                }
                msg = outgoing.recv() => match msg {
                    Some(packet) => {
                        if let Err(e) = sink.send(packet).await {
                            error!(%peer_addr, error = %e, "Failed to write to dispatcher");
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        // A dead writer means a dead connection; wakes any pending recv
        cancel.cancel();
        debug!(%peer_addr, "Dispatcher writer task exiting");
    }
}

/// Close the queue and throw away whatever is still in it
fn discard_queued(outgoing: &mut mpsc::Receiver<Packet>) -> usize {
    outgoing.close();
    let mut dropped = 0;
    while outgoing.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

impl DispatcherConnection for TcpConnection {
    fn is_open(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    async fn recv(&self) -> Result<Packet> {
        let mut reader = self.reader.lock().await;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CourierError::ConnectionClosed),
            next = tokio::time::timeout(self.recv_timeout, reader.next()) => match next {
                Err(_) => Err(CourierError::receive_timeout(self.recv_timeout)),
                Ok(Some(Ok(packet))) => Ok(packet),
                Ok(Some(Err(e))) => Err(codec_error(e)),
                Ok(None) => Err(CourierError::ConnectionClosed),
            },
        }
    }

    fn close(&self) {
        self.cancel.cancel();
    }

    fn send_handshake(&self, handshake: Handshake) -> Result<()> {
        let packet = handshake.to_packet().map_err(codec_error)?;
        self.send_packet(packet)
    }

    fn send_packet(&self, packet: Packet) -> Result<()> {
        if !self.is_open() {
            return Err(CourierError::ConnectionClosed);
        }
        self.outgoing.try_send(packet).map_err(|e| match e {
            TrySendError::Full(_) => CourierError::SendQueueFull {
                capacity: self.queue_capacity,
            },
            TrySendError::Closed(_) => CourierError::ConnectionClosed,
        })
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("peer_addr", &self.peer_addr)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{new_config_handle, ClientConfig, DispatcherEntry};
    use bytes::Bytes;
    use courier_protocol::MsgType;
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    async fn listener_config(transport: TransportConfig) -> (TcpListener, ConfigHandle) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = ClientConfig {
            dispatchers: vec![DispatcherEntry::new(1, "127.0.0.1", port)],
            transport,
        };
        (listener, new_config_handle(config))
    }

    fn fast_transport() -> TransportConfig {
        TransportConfig {
            recv_timeout_ms: 50,
            send_queue_capacity: 8,
            ..TransportConfig::default()
        }
    }

    #[tokio::test]
    async fn test_dial_unknown_dispatcher() {
        let connector = TcpConnector::new(new_config_handle(ClientConfig::default()));
        let err = connector.dial(7).await.unwrap_err();
        assert!(matches!(err, CourierError::DispatcherNotConfigured(7)));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Bind then drop to get a port nobody listens on
        let (listener, handle) = listener_config(fast_transport()).await;
        drop(listener);

        let err = TcpConnector::new(handle).dial(1).await.unwrap_err();
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_send_and_recv_packets() {
        let (listener, handle) = listener_config(fast_transport()).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        let (server_stream, _) = accepted.unwrap();
        let mut server = Framed::new(server_stream, PacketCodec::new());

        assert!(conn.is_open());
        conn.send_handshake(Handshake::SetGateId { gate_id: 4 }).unwrap();
        conn.send_packet(Packet::new(MsgType(1001), Bytes::from_static(b"up")))
            .unwrap();

        let first = server.next().await.unwrap().unwrap();
        assert_eq!(
            Handshake::from_packet(&first).unwrap(),
            Some(Handshake::SetGateId { gate_id: 4 })
        );
        let second = server.next().await.unwrap().unwrap();
        assert_eq!(&second.payload[..], b"up");

        server
            .send(Packet::new(MsgType(2001), Bytes::from_static(b"down")))
            .await
            .unwrap();
        let received = conn.recv().await.unwrap();
        assert_eq!(received.msg_type, MsgType(2001));
        assert_eq!(&received.payload[..], b"down");
    }

    #[tokio::test]
    async fn test_recv_times_out_without_closing() {
        let (listener, handle) = listener_config(fast_transport()).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        let _server = accepted.unwrap();

        let err = conn.recv().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn test_recv_reports_peer_close() {
        let (listener, handle) = listener_config(fast_transport()).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        drop(accepted.unwrap());

        let err = conn.recv().await.unwrap_err();
        assert!(matches!(err, CourierError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_close_rejects_sends_and_wakes_recv() {
        let (listener, handle) = listener_config(fast_transport()).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        let (server_stream, _) = accepted.unwrap();
        let mut server = Framed::new(server_stream, PacketCodec::new());

        conn.close();
        assert!(!conn.is_open());
        assert!(matches!(
            conn.send_packet(Packet::new(MsgType(1001), Bytes::new())),
            Err(CourierError::ConnectionClosed)
        ));
        assert!(matches!(conn.recv().await, Err(CourierError::ConnectionClosed)));

        // Writer shuts the socket down, so the dispatcher reads EOF
        assert!(server.next().await.is_none());
    }

    #[tokio::test]
    async fn test_discard_queued_counts_and_closes() {
        let (tx, mut rx) = mpsc::channel(8);
        for i in 0..3 {
            tx.try_send(Packet::new(MsgType(1000 + i), Bytes::new())).unwrap();
        }

        assert_eq!(discard_queued(&mut rx), 3);
        assert!(tx
            .try_send(Packet::new(MsgType(1001), Bytes::new()))
            .is_err());
        assert_eq!(discard_queued(&mut rx), 0);
    }

    #[tokio::test]
    async fn test_recv_after_close_reports_closed_not_timeout() {
        let transport = TransportConfig {
            recv_timeout_ms: 1,
            ..fast_transport()
        };
        let (listener, handle) = listener_config(transport).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        let _server = accepted.unwrap();

        conn.close();
        for _ in 0..20 {
            assert!(matches!(conn.recv().await, Err(CourierError::ConnectionClosed)));
        }
    }

    #[tokio::test]
    async fn test_send_queue_full() {
        let transport = TransportConfig {
            send_queue_capacity: 1,
            ..fast_transport()
        };
        let (listener, handle) = listener_config(transport).await;
        let connector = TcpConnector::new(handle);

        let (conn, accepted) = tokio::join!(connector.dial(1), listener.accept());
        let conn = conn.unwrap();
        let _server = accepted.unwrap();

        // No yield between the two sends, so the writer cannot drain the queue
        conn.send_packet(Packet::new(MsgType(1001), Bytes::new())).unwrap();
        let err = conn
            .send_packet(Packet::new(MsgType(1002), Bytes::new()))
            .unwrap_err();
        assert!(matches!(err, CourierError::SendQueueFull { capacity: 1 }));
    }
}
