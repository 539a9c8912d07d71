use std::{net::SocketAddr, sync::Arc, time::Duration};

use session_tracker_lib::{PositionSample, PositionSource, SourceError};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Mutex,
    task::JoinHandle,
};

use super::{channel, ChannelSource, SampleSender};

pub const DEFAULT_PORT: u16 = 3169;
/// A serialized sample is well under this. Anything bigger is garbage.
pub const MAX_FRAME_LEN: usize = 1024;

const QUEUE_SIZE: usize = 64;
/// Wait this long after a failed accept before trying again.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

// Wire format, per sample: [u32 big endian length][bincode PositionSample].
// A length of 0 ends the stream.

/// Accepts connections from devices and turns the frames they push into samples.
/// One device at a time: others are turned away until it disconnects.
pub struct DeviceEndpoint {
    source: ChannelSource,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl DeviceEndpoint {
    pub async fn bind(addr: SocketAddr) -> Result<Self, SourceError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (tx, source) = channel(QUEUE_SIZE, format!("device@{local_addr}"));
        let accept_task = tokio::spawn(listen(listener, tx));

        tracing::info!("Listening for devices on {}", local_addr);

        Ok(Self {
            source,
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for DeviceEndpoint {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

#[async_trait::async_trait]
impl PositionSource for DeviceEndpoint {
    async fn next_sample(&mut self) -> Result<Option<PositionSample>, SourceError> {
        self.source.next_sample().await
    }

    async fn release(&mut self) {
        self.source.release().await;
    }

    fn name(&self) -> &str {
        self.source.name()
    }
}

async fn listen(listener: TcpListener, tx: SampleSender) {
    // The device currently feeding the session, if any
    let active: Arc<Mutex<Option<SocketAddr>>> = Arc::default();

    loop {
        let (stream, addr) = next_connection(|| listener.accept()).await;

        {
            let mut active_lock = active.lock().await;
            if let Some(current) = *active_lock {
                tracing::warn!("Rejecting device {}, {} is already connected", addr, current);
                continue;
            }
            *active_lock = Some(addr);
        }

        tracing::info!("New device connection from {}", addr);

        let tx = tx.clone();
        let active = active.clone();
        tokio::spawn(async move {
            match handle_connection(stream, &tx).await {
                Ok(count) => tracing::info!("Device {} disconnected after {} samples", addr, count),
                Err(err) => {
                    tracing::warn!("Connection from {} failed: {}", addr, err);
                    let _ = tx.send(Err(err)).await;
                }
            }
            active.lock().await.take();
        });
    }
}

async fn next_connection<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(err) => {
                tracing::error!("Failed to accept connection: {}", err);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

/// Forwards every frame on the stream until the device ends it. Returns the number of samples.
pub async fn handle_connection<R: AsyncRead + Unpin>(mut stream: R, tx: &SampleSender) -> Result<usize, SourceError> {
    let mut count = 0;
    while let Some(sample) = read_frame(&mut stream).await? {
        if tx.send(Ok(sample)).await.is_err() {
            // Nobody is listening anymore
            break;
        }
        count += 1;
    }
    Ok(count)
}

/// `Ok(None)` on an end frame, or when the device just hangs up between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<PositionSample>, SourceError> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    if len == 0 {
        return Ok(None);
    }
    if len > MAX_FRAME_LEN {
        return Err(SourceError::Malformed(format!("Frame of {} bytes is too large", len)));
    }

    let mut buf = vec![0; len];
    reader.read_exact(&mut buf).await.map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => SourceError::Malformed("Frame was cut short".into()),
        _ => err.into(),
    })?;

    PositionSample::try_from(buf.as_slice()).map(Some)
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, sample: &PositionSample) -> Result<(), SourceError> {
    let bytes = sample.to_bytes()?;
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(&bytes).await?;
    Ok(())
}

pub async fn write_end<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<(), SourceError> {
    writer.write_u32(0).await?;
    writer.flush().await?;
    Ok(())
}

/// The device side: connects to an endpoint and pushes everything the source produces.
pub async fn push_samples<S: PositionSource>(addr: SocketAddr, mut source: S) -> Result<usize, SourceError> {
    let mut stream = TcpStream::connect(addr).await?;
    tracing::info!("Connected to {}, pushing samples from {}", addr, source.name());

    let mut count = 0;
    while let Some(sample) = source.next_sample().await? {
        write_frame(&mut stream, &sample).await?;
        count += 1;
        tracing::trace!("Pushed sample {}", count);
    }

    write_end(&mut stream).await?;
    source.release().await;
    Ok(count)
}
