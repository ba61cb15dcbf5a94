//! Channel manager: the single-active-connection registry, the reconnection
//! coordinator, and the typed send/listen surface.
//!
//! Concurrency model: one logical thread of execution. The manager is an
//! explicitly constructed, single-owner object (`&mut self` everywhere);
//! connection and identity state are mutated only inside
//! [`ChannelManager::connect`] / [`ChannelManager::disconnect`], and dispatch
//! always iterates a snapshot of the attached callbacks.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use inklet_core::identity::{FileIdentityStore, IdentityProvider, IdentityStore};

use crate::envelope::{decode_received, encode_envelope, Envelope, MessageKind, ReceivedEnvelope};
use crate::error::ChannelError;
use crate::listeners::{ListenerCallback, ListenerHandle, ListenerRegistry};
use crate::transport::{ChannelConfig, SocketTransport, WebSocketTransport};

/// Lifecycle state of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is up but listeners are still being attached; nothing may
    /// be dispatched yet.
    Connecting,
    Open,
    /// The peer closed the channel. Reconnecting is the caller's decision.
    Closed,
}

/// The one live transport bound to an identity, plus the listeners attached
/// to this particular connection instance.
pub struct ActiveConnection<T: SocketTransport> {
    transport: T,
    identity: String,
    state: ConnectionState,
    attached: Vec<(ListenerHandle, ListenerCallback)>,
}

impl<T: SocketTransport> ActiveConnection<T> {
    fn new(transport: T, identity: String) -> Self {
        Self {
            transport,
            identity,
            state: ConnectionState::Connecting,
            attached: Vec::new(),
        }
    }

    /// The identity this connection is bound to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of callbacks attached to this connection instance.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    fn attach(&mut self, handle: ListenerHandle, callback: ListenerCallback) {
        // A handle attaches to a given connection at most once, so a stray
        // second reapply pass cannot double-register anything.
        if self.attached.iter().any(|(attached, _)| *attached == handle) {
            warn!(handle, "listener already attached to this connection");
            return;
        }
        self.attached.push((handle, callback));
    }

    fn detach(&mut self, handle: ListenerHandle) {
        self.attached.retain(|(attached, _)| *attached != handle);
    }

    fn message_callbacks(&self) -> Vec<Arc<dyn Fn(&str) + Send + Sync>> {
        self.attached
            .iter()
            .filter_map(|(_, callback)| match callback {
                ListenerCallback::Message(callback) => Some(Arc::clone(callback)),
                ListenerCallback::Open(_) => None,
            })
            .collect()
    }

    fn open_callbacks(&self) -> Vec<Arc<dyn Fn() + Send + Sync>> {
        self.attached
            .iter()
            .filter_map(|(_, callback)| match callback {
                ListenerCallback::Open(callback) => Some(Arc::clone(callback)),
                ListenerCallback::Message(_) => None,
            })
            .collect()
    }
}

/// Manager for the single identity-addressed realtime channel.
///
/// Holds at most one live connection, the registry of listener entries that
/// outlive it, and the identity provider used to resolve the default
/// identity. See the crate docs for the lifecycle rules.
pub struct ChannelManager<T = WebSocketTransport, S = FileIdentityStore>
where
    T: SocketTransport,
    S: IdentityStore,
{
    config: ChannelConfig,
    identity: IdentityProvider<S>,
    listeners: ListenerRegistry,
    current: Option<ActiveConnection<T>>,
}

impl ChannelManager<WebSocketTransport, FileIdentityStore> {
    /// Manager over the WebSocket transport and the file-backed identity
    /// store at its default platform location.
    pub fn with_defaults(config: ChannelConfig) -> Result<Self, ChannelError> {
        Ok(Self::new(config, IdentityProvider::from_default_store()?))
    }

    /// Manager built from the loaded client configuration, honouring its
    /// identity store path override when set.
    pub fn from_client_config(config: &inklet_core::ClientConfig) -> Result<Self, ChannelError> {
        let store = match &config.identity.store_path {
            Some(path) => FileIdentityStore::new(path),
            None => FileIdentityStore::at_default_path()?,
        };
        Ok(Self::new(
            ChannelConfig::from(config),
            IdentityProvider::new(store),
        ))
    }
}

impl<T, S> ChannelManager<T, S>
where
    T: SocketTransport,
    S: IdentityStore,
{
    pub fn new(config: ChannelConfig, identity: IdentityProvider<S>) -> Self {
        Self {
            config,
            identity,
            listeners: ListenerRegistry::new(),
            current: None,
        }
    }

    /// Ensure a live connection bound to `identity` (the persisted default
    /// when `None`), replacing the current connection if it is bound to a
    /// different identity.
    ///
    /// Idempotent: a connection already bound to the resolved identity is
    /// returned untouched and listeners are not reapplied. On a fresh
    /// connection, every registered listener is reattached in registration
    /// order before anything can be dispatched; `Open` callbacks then fire
    /// once.
    #[instrument(skip(self, identity))]
    pub async fn connect(
        &mut self,
        identity: Option<&str>,
        reapply_listeners: bool,
    ) -> Result<(), ChannelError> {
        // Resolve (and on first use create + persist) the identity before
        // the transport opens, so a near-simultaneous default connect
        // resolves to the same identity.
        let identity = match identity {
            Some(identity) => identity.to_owned(),
            None => self.identity.get()?,
        };

        if let Some(connection) = &self.current {
            if connection.identity == identity {
                debug!(%identity, "already bound to this identity");
                return Ok(());
            }
            info!(old = %connection.identity, new = %identity, "identity changed, replacing connection");
            self.disconnect(true).await?;
        }

        self.identity.set(&identity)?;

        debug!(%identity, endpoint = %self.config.endpoint, "opening channel");
        let transport = T::connect(&self.config, &identity).await?;
        self.current = Some(ActiveConnection::new(transport, identity));

        if reapply_listeners {
            self.reapply_listeners();
        }

        // Every entry is attached; only now may listener logic run.
        if let Some(connection) = self.current.as_mut() {
            connection.state = ConnectionState::Open;
            for callback in connection.open_callbacks() {
                callback();
            }
        }

        Ok(())
    }

    /// Close the live connection, if any. Listener entries survive for a
    /// future reconnect unless `keep_listeners` is false, which purges the
    /// registry entirely. The current connection and identity are cleared
    /// even when closing the transport fails.
    #[instrument(skip(self))]
    pub async fn disconnect(&mut self, keep_listeners: bool) -> Result<(), ChannelError> {
        let Some(mut connection) = self.current.take() else {
            return Ok(());
        };

        info!(identity = %connection.identity, "closing channel");
        let result = connection.transport.close().await;

        if !keep_listeners {
            debug!(count = self.listeners.len(), "purging listener registry");
            self.listeners.clear();
        }

        result
    }

    /// Run `f` against the live connection. With `create_if_absent` a
    /// connection is established first (default identity, listeners
    /// reapplied); otherwise a missing connection is a silent no-op and
    /// `Ok(None)` is returned.
    pub async fn with_current<R>(
        &mut self,
        create_if_absent: bool,
        f: impl FnOnce(&mut ActiveConnection<T>) -> R,
    ) -> Result<Option<R>, ChannelError> {
        if create_if_absent {
            self.connect(None, true).await?;
        }
        Ok(self.current.as_mut().map(f))
    }

    /// Encode and transmit an envelope, establishing a connection with the
    /// default identity first if none exists. Sending on a connection that
    /// is not open is a caller-visible error, never a silent drop.
    pub async fn send(&mut self, envelope: Envelope) -> Result<(), ChannelError> {
        self.connect(None, true).await?;

        let Some(connection) = self.current.as_mut() else {
            return Err(ChannelError::NotOpen);
        };
        if connection.state != ConnectionState::Open {
            return Err(ChannelError::NotOpen);
        }

        let frame = encode_envelope(&envelope)?;
        debug!(kind = %envelope.kind(), "sending envelope");
        connection.transport.send(&frame).await
    }

    /// Register a typed inbound-message listener. The returned handle stays
    /// valid across any number of reconnects until explicitly removed. A
    /// connection is established (default identity) if none exists.
    ///
    /// Each listener decodes frames independently: a malformed or
    /// unknown-kind frame is dropped for this listener without affecting
    /// other listeners or any later frame.
    pub async fn listen_for(
        &mut self,
        kind: MessageKind,
        callback: impl Fn(ReceivedEnvelope) + Send + Sync + 'static,
    ) -> Result<ListenerHandle, ChannelError> {
        self.connect(None, true).await?;

        let wrapper: Arc<dyn Fn(&str) + Send + Sync> =
            Arc::new(move |frame: &str| match decode_received(frame) {
                Ok(received) if received.envelope.kind() == kind => callback(received),
                Ok(_) => {}
                Err(error) => debug!(%error, "dropping undecodable inbound frame"),
            });
        Ok(self.register(ListenerCallback::Message(wrapper)))
    }

    /// Register a connection-opened listener. It fires once per
    /// connection-open transition after registration: on each reconnect,
    /// and for the connection this call itself creates when none existed.
    /// A connection that is already open does not fire it retroactively.
    pub async fn on_open(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<ListenerHandle, ChannelError> {
        // Registered before the connection is ensured, so a lazily created
        // connection picks the entry up in its reapply pass and fires it on
        // the open transition.
        let handle = self.register(ListenerCallback::Open(Arc::new(callback)));
        self.connect(None, true).await?;
        Ok(handle)
    }

    /// Detach a listener from the live connection. With `purge` the entry is
    /// removed permanently; without it the entry stays registered and will
    /// be reattached on the next reconnect. Unknown handles are a no-op.
    pub fn remove_listener(&mut self, handle: ListenerHandle, purge: bool) {
        if !self.listeners.contains(handle) {
            return;
        }
        if let Some(connection) = self.current.as_mut() {
            connection.detach(handle);
        }
        if purge {
            self.listeners.remove(handle);
            debug!(handle, "removed listener");
        }
    }

    /// Sweep every registered listener through [`Self::remove_listener`].
    pub fn remove_all_listeners(&mut self, purge: bool) {
        for handle in self.listeners.handles() {
            self.remove_listener(handle, purge);
        }
    }

    /// Await the next inbound frame on the live connection and hand it to a
    /// snapshot of the attached message listeners.
    ///
    /// Returns `Ok(false)` when there is nothing to dispatch: no connection,
    /// connection not open, or the peer closed the channel (the connection
    /// is then marked closed).
    pub async fn dispatch_next(&mut self) -> Result<bool, ChannelError> {
        let Some(connection) = self.current.as_mut() else {
            return Ok(false);
        };
        if connection.state != ConnectionState::Open {
            return Ok(false);
        }

        match connection.transport.recv().await {
            Ok(Some(frame)) => {
                let callbacks = connection.message_callbacks();
                debug!(listeners = callbacks.len(), "dispatching inbound frame");
                for callback in &callbacks {
                    callback(&frame);
                }
                Ok(true)
            }
            Ok(None) => {
                info!(identity = %connection.identity, "peer closed the channel");
                connection.state = ConnectionState::Closed;
                Ok(false)
            }
            Err(error) => {
                connection.state = ConnectionState::Closed;
                Err(error)
            }
        }
    }

    /// Lifecycle state of the live connection, if any.
    pub fn state(&self) -> Option<ConnectionState> {
        self.current.as_ref().map(|connection| connection.state)
    }

    /// Identity the live connection is bound to, if any.
    pub fn current_identity(&self) -> Option<&str> {
        self.current
            .as_ref()
            .map(|connection| connection.identity.as_str())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), Some(ConnectionState::Open))
    }

    /// Number of registered listener entries, attached or not.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Reattach every registered listener to the current connection, in
    /// registration (ascending handle) order. Runs against a freshly created
    /// connection; `attach` skips handles that are somehow already attached.
    fn reapply_listeners(&mut self) {
        let Some(connection) = self.current.as_mut() else {
            return;
        };

        let mut reapplied = 0usize;
        for (handle, callback) in self.listeners.iter() {
            connection.attach(handle, callback.clone());
            reapplied += 1;
        }
        if reapplied > 0 {
            debug!(count = reapplied, "reapplied listeners to new connection");
        }
    }

    fn register(&mut self, callback: ListenerCallback) -> ListenerHandle {
        let handle = self.listeners.insert(callback.clone());
        if let Some(connection) = self.current.as_mut() {
            connection.attach(handle, callback);
        }
        handle
    }
}
