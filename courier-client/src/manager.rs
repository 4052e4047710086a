//! Connection manager for a single dispatcher
//!
//! Keeps exactly one live connection to a dispatcher. The first connect is
//! awaited by the caller; after that a supervised background task owns the
//! receive loop and reconnects transparently whenever the connection drops.
//! Senders grab the current connection through [`ConnectionManager::current_connection_for_send`],
//! which is a lock-free read and never waits on reconnection.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use courier_protocol::{ClientKind, DispatcherId, Handshake};
use courier_utils::CourierError;

use crate::connection::{ConnectionFactory, DispatcherConnection, DispatcherDelegate};
use crate::retry::RetryPolicy;
use crate::slot::ConnectionSlot;

/// Construction-time settings for a [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    pub kind: ClientKind,
    pub dispatcher_id: DispatcherId,
    /// Forwarded in every game handshake
    pub is_restore: bool,
    pub retry: RetryPolicy,
}

impl ManagerOptions {
    pub fn new(kind: ClientKind, dispatcher_id: DispatcherId) -> Self {
        Self {
            kind,
            dispatcher_id,
            is_restore: false,
            retry: RetryPolicy::default(),
        }
    }

    pub fn restoring(mut self, is_restore: bool) -> Self {
        self.is_restore = is_restore;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Maintains the connection to one dispatcher and routes what it receives
/// to a [`DispatcherDelegate`].
pub struct ConnectionManager<F, D>
where
    F: ConnectionFactory,
    D: DispatcherDelegate,
{
    inner: Arc<Inner<F, D>>,
}

struct Inner<F, D>
where
    F: ConnectionFactory,
    D: DispatcherDelegate,
{
    kind: ClientKind,
    dispatcher_id: DispatcherId,
    local_id: AtomicU16,
    is_restore: bool,
    /// Flips to true after the first successful connect and stays there
    reconnected: AtomicBool,
    started: AtomicBool,
    slot: ConnectionSlot<F::Connection>,
    factory: F,
    delegate: D,
    retry: RetryPolicy,
}

impl<F, D> ConnectionManager<F, D>
where
    F: ConnectionFactory,
    D: DispatcherDelegate,
{
    pub fn new(options: ManagerOptions, factory: F, delegate: D) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind: options.kind,
                dispatcher_id: options.dispatcher_id,
                local_id: AtomicU16::new(0),
                is_restore: options.is_restore,
                reconnected: AtomicBool::new(false),
                started: AtomicBool::new(false),
                slot: ConnectionSlot::empty(),
                factory,
                delegate,
                retry: options.retry,
            }),
        }
    }

    /// Set the gate/game id sent in handshakes. Call before [`connect`](Self::connect).
    pub fn set_local_id(&self, local_id: u16) {
        self.inner.local_id.store(local_id, Ordering::Release);
    }

    pub fn local_id(&self) -> u16 {
        self.inner.local_id()
    }

    pub fn dispatcher_id(&self) -> DispatcherId {
        self.inner.dispatcher_id
    }

    pub fn kind(&self) -> ClientKind {
        self.inner.kind
    }

    pub fn is_restore(&self) -> bool {
        self.inner.is_restore
    }

    /// Whether at least one connect has completed
    pub fn has_reconnected_before(&self) -> bool {
        self.inner.reconnected.load(Ordering::Acquire)
    }

    /// Connect to the dispatcher and start the receive loop.
    ///
    /// The first call returns once a connection is established, retrying for
    /// as long as that takes. Later calls return immediately.
    pub async fn connect(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!(manager = %self, "connect called again, already started");
            return;
        }

        // Dropping this future before the first connect lands must leave
        // the manager startable again
        let bootstrap = StartGuard {
            started: &self.inner.started,
            armed: true,
        };
        self.inner.ensure_connected().await;
        bootstrap.disarm();

        tokio::spawn(Arc::clone(&self.inner).supervise());
    }

    /// Connection to send through right now.
    ///
    /// `None` before the first connect. The returned connection may already be
    /// closed if a reconnect is in progress; sends on it then fail.
    pub fn current_connection_for_send(&self) -> Option<Arc<F::Connection>> {
        self.inner.slot.get()
    }
}

/// Clears the started flag unless the bootstrap ran to completion
struct StartGuard<'a> {
    started: &'a AtomicBool,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("connect cancelled before the first connection, resetting");
            self.started.store(false, Ordering::Release);
        }
    }
}

impl<F, D> fmt::Display for ConnectionManager<F, D>
where
    F: ConnectionFactory,
    D: DispatcherDelegate,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionManager<{}>", self.inner.dispatcher_id)
    }
}

impl<F, D> Inner<F, D>
where
    F: ConnectionFactory,
    D: DispatcherDelegate,
{
    fn local_id(&self) -> u16 {
        self.local_id.load(Ordering::Acquire)
    }

    /// Return the published connection if open, otherwise dial until a new
    /// one is up, publish it and send the handshake.
    async fn ensure_connected(&self) -> Arc<F::Connection> {
        loop {
            if let Some(conn) = self.slot.get() {
                if conn.is_open() {
                    return conn;
                }
            }

            let conn = match self.factory.dial(self.dispatcher_id).await {
                Ok(conn) => Arc::new(conn),
                Err(e) => {
                    error!(
                        dispatcher_id = self.dispatcher_id,
                        error = %e,
                        "Connect to dispatcher failed"
                    );
                    self.retry.wait().await;
                    continue;
                }
            };

            self.slot.set(Some(Arc::clone(&conn)));

            let is_reconnect = self.reconnected.load(Ordering::Acquire);
            let local_id = self.local_id();
            let handshake = Handshake::for_kind(self.kind, local_id, is_reconnect, self.is_restore);
            if let Err(e) = conn.send_handshake(handshake) {
                // A broken connection surfaces on the next recv
                warn!(
                    dispatcher_id = self.dispatcher_id,
                    error = %e,
                    "Failed to queue handshake"
                );
            }
            self.reconnected.store(true, Ordering::Release);

            info!(
                dispatcher_id = self.dispatcher_id,
                kind = %self.kind,
                local_id,
                is_reconnect,
                "Connected to dispatcher"
            );
            return conn;
        }
    }

    /// Receive loop. Never returns.
    async fn serve(self: Arc<Self>) {
        debug!(dispatcher_id = self.dispatcher_id, "Start serving dispatcher connection");

        loop {
            let conn = self.ensure_connected().await;

            let lost = match conn.recv().await {
                Ok(packet) => {
                    trace!(
                        dispatcher_id = self.dispatcher_id,
                        msg_type = %packet.msg_type,
                        len = packet.payload.len(),
                        "Received packet"
                    );
                    self.delegate.on_packet(packet.msg_type, packet.payload);

                    // Writer side may have failed while the packet was handled
                    if conn.is_open() {
                        continue;
                    }
                    CourierError::ConnectionClosed
                }
                // A writer failure inside the receive window only shows on is_open
                Err(e) if e.is_timeout() => {
                    if conn.is_open() {
                        continue;
                    }
                    CourierError::ConnectionClosed
                }
                Err(e) => e,
            };

            error!(
                dispatcher_id = self.dispatcher_id,
                error = %lost,
                "Dispatcher connection lost"
            );
            conn.close();
            self.delegate.on_disconnect();
            self.retry.wait().await;
        }
    }

    /// Run the serve loop, restarting it if it panics
    async fn supervise(self: Arc<Self>) {
        loop {
            let serve = tokio::spawn(Arc::clone(&self).serve());

            match serve.await {
                Ok(()) => return,
                Err(e) if e.is_panic() => {
                    error!(
                        dispatcher_id = self.dispatcher_id,
                        "Serve loop panicked, restarting"
                    );
                }
                Err(e) => {
                    warn!(
                        dispatcher_id = self.dispatcher_id,
                        error = %e,
                        "Serve loop cancelled"
                    );
                    return;
                }
            }
        }
    }
}
