//! Seams between the executor and a concrete database driver.

use std::sync::Arc;

use crate::errors::TxError;

/// A single database session that can run one manual transaction at a time.
///
/// Releasing the connection is dropping it: pooled implementations return
/// themselves to their pool on drop.
pub trait TxConnection {
    /// Driver error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Leave auto-commit mode and open a transaction.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Make the open transaction durable.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Discard the open transaction.
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

/// Supplier of connections, typically a pool.
///
/// Must be safe to call concurrently; each returned connection is owned
/// exclusively by the caller until dropped.
pub trait ConnectionSource {
    /// Connection type handed out by this source.
    type Connection: TxConnection;

    /// Acquire a connection.
    ///
    /// Fails with [`TxError::ConnectionAcquisition`] when the source is not
    /// running or no connection became available in time.
    fn acquire(&self) -> Result<Self::Connection, TxError>;
}

impl<S: ConnectionSource + ?Sized> ConnectionSource for Arc<S> {
    type Connection = S::Connection;

    fn acquire(&self) -> Result<Self::Connection, TxError> {
        (**self).acquire()
    }
}
