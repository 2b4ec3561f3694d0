use std::{io, path::PathBuf};

use async_trait::async_trait;
use switchyard_common::{Address, Message, config, dispatch};
use tokio::{
    fs::OpenOptions,
    io::{AsyncWrite, AsyncWriteExt},
};

use crate::{
    channel::{Channel, ConnectParams, Identity},
    error::{DispatchError, Result},
    event::TransportEvent,
    session::Session,
    state::ChannelState,
};

/// Archives every message it is given to a file.
///
/// Configured with `mail.file.path` (required) and `mail.file.append`
/// (defaults to `true`). Messages are separated by a blank line. When
/// appending is off, each message replaces the previous file contents.
#[derive(Debug)]
pub struct FileChannel {
    identity: Identity,
    state: ChannelState,
    path: PathBuf,
    append: bool,
}

impl FileChannel {
    pub const PROTOCOL: &'static str = "file";

    /// # Errors
    /// If `mail.file.path` is missing or `mail.file.append` is not a boolean.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let scope = session.scope();
        let protocol = identity.protocol();
        let path = scope.require(&config::key(protocol, "path"))?;
        let append = scope.get_bool(&config::key(protocol, "append"), true)?;
        let path = PathBuf::from(path);

        Ok(Self {
            identity,
            state: ChannelState::new(),
            path,
            append,
        })
    }

    async fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .await?;

        write_and_close(&mut file, data, &self.path.display().to_string()).await
    }
}

/// Write one entry and shut `writer` down. A failed shutdown is only
/// reported when the write itself succeeded.
async fn write_and_close<W>(writer: &mut W, data: &[u8], target: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = write_entry(writer, data).await;
    let closed = writer.shutdown().await;

    match (written, closed) {
        (Err(err), Err(cleanup)) => {
            dispatch!(
                level = WARN,
                "Unable to close {target} after a failed write: {cleanup}"
            );
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(()), closed) => closed,
    }
}

/// Body, terminator and separator go out in one write.
async fn write_entry<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if data.is_empty() {
        return Ok(());
    }

    let mut entry = Vec::with_capacity(data.len() + 4);
    entry.extend_from_slice(data);
    if !data.ends_with(b"\n") {
        entry.extend_from_slice(b"\r\n");
    }
    entry.extend_from_slice(b"\r\n");

    writer.write_all(&entry).await
}

#[async_trait]
impl Channel for FileChannel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn state(&self) -> Option<&ChannelState> {
        Some(&self.state)
    }

    async fn connect_with(&self, _params: ConnectParams) -> Result<()> {
        self.state.open(&self.identity);
        Ok(())
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        let outcome = match message.to_bytes() {
            Ok(data) => self.write(&data).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                dispatch!(
                    level = DEBUG,
                    "Archived message {:?} to {}",
                    message.message_id(),
                    self.path.display()
                );
                self.state
                    .notify_transport(&TransportEvent::delivered(message.message_id(), recipients));
                Ok(())
            }
            Err(err) => {
                dispatch!(
                    level = ERROR,
                    "Failed to archive message {:?} to {}: {err}",
                    message.message_id(),
                    self.path.display()
                );
                self.state.notify_transport(&TransportEvent::not_delivered(
                    message.message_id(),
                    recipients,
                ));
                Err(DispatchError::messaging_caused_by(
                    "error writing message to file",
                    err,
                ))
            }
        }
    }
}
