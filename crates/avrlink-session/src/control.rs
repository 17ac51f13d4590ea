use std::sync::Arc;

use avrlink_frame::{canonical, Attribute, Update, Value};
use avrlink_transport::{AvrStream, DeviceAddress, TcpTransport};
use tracing::{error, info, warn};

use crate::ack::PendingAck;
use crate::error::Result;
use crate::session::{Session, SessionConfig};
use crate::state::{StateSink, StateStore};

/// A session bound to a [`StateStore`].
///
/// Writes go through the store's undo slot: the new value is recorded
/// before the command is sent and rolled back when the receiver does not
/// confirm it.
pub struct Controller<S: AvrStream + 'static = TcpTransport> {
    session: Session<S>,
    store: Arc<StateStore>,
}

impl Controller<TcpTransport> {
    /// Connect to a receiver with a fresh store.
    pub fn connect(address: DeviceAddress, config: SessionConfig) -> Result<Self> {
        let store = Arc::new(StateStore::new());
        let session = Session::connect(address, config, store.clone())?;
        Ok(Self::new(session, store))
    }
}

impl<S: AvrStream + 'static> Controller<S> {
    /// Pair a session with the store it notifies.
    pub fn new(session: Session<S>, store: Arc<StateStore>) -> Self {
        Self { session, store }
    }

    /// Start a session on a connected stream with a fresh store.
    pub fn from_stream(stream: S, config: SessionConfig) -> Result<Self> {
        let store = Arc::new(StateStore::new());
        let sink: Arc<dyn StateSink> = store.clone();
        let session = Session::from_stream(stream, config, sink)?;
        Ok(Self::new(session, store))
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Set `attribute` on the receiver and wait for its acknowledgement.
    ///
    /// Invalid values are rejected without touching the store or the
    /// stream. Any failure after that restores the value the store held
    /// before this call; there is no resend.
    pub fn set(&self, attribute: Attribute, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let expected = canonical(attribute, &value)?;

        self.store.begin_write(attribute, expected.clone());
        let result = self
            .session
            .send_command(attribute, &value)
            .and_then(PendingAck::confirm);

        match &result {
            // A read between begin_write and the lock may have forwarded an
            // older report; the echo is authoritative.
            Ok(()) => self.store.notify(attribute, &expected),
            Err(err) => {
                error!(%attribute, %value, error = %err, "unable to set receiver attribute");
                let restored = self.store.revert(attribute);
                warn!(%attribute, restored = ?restored, "reverted to value before the write");
            }
        }
        result
    }

    /// Query `attribute` and record the answer in the store.
    pub fn get(&self, attribute: Attribute) -> Result<Value> {
        let value = self.session.request_attribute(attribute)?;
        self.store.notify(attribute, &value);
        Ok(value)
    }

    /// Refresh the store from the receiver.
    ///
    /// Queries every watched attribute, or all of them when nothing is
    /// watched. Attributes that do not answer are skipped.
    pub fn sync(&self) -> Vec<Update> {
        let mut attributes = self.store.watched();
        if attributes.is_empty() {
            attributes = Attribute::ALL.to_vec();
        }

        let mut updates = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            match self.get(attribute) {
                Ok(value) => updates.push(Update { attribute, value }),
                Err(err) => warn!(%attribute, error = %err, "initial state query failed"),
            }
        }
        info!(count = updates.len(), "receiver state synchronized");
        updates
    }

    /// Stop the underlying session.
    pub fn stop(&self) {
        self.session.stop();
    }
}
