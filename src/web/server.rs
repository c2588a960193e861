// The accept loop. Connections are handled strictly one after another:
// read, dispatch, respond, close, then accept the next one. This also
// serializes every call into the plugin.

use super::{framer, handlers};
use crate::error::FrameError;
use crate::plugin::LanguageExtractor;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Accepts and serves connections until `shutdown` resolves.
///
/// The shutdown future is only polled between connections, so a connection
/// in flight is always finished before this returns.
pub async fn serve<E, F>(listener: &TcpListener, extractor: &E, shutdown: F)
where
    E: LanguageExtractor + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let connection_id = Uuid::new_v4();
                        let span = info_span!("connection", %connection_id, %peer);
                        handle_connection(stream, extractor).instrument(span).await;
                    }
                    Err(e) => {
                        // Transient (e.g. the peer reset before accept); keep going.
                        warn!("Failed to accept connection: {}", e);
                    }
                }
            }
        }
    }
}

/// Serves exactly one request on `stream` and closes it.
pub async fn handle_connection<S, E>(mut stream: S, extractor: &E)
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: LanguageExtractor + ?Sized,
{
    let response = match framer::read_request(&mut stream).await {
        Ok(request) => {
            debug!(
                "{} {} ({} body bytes)",
                request.method,
                request.path,
                request.body.len()
            );
            Some(handlers::route(&request, extractor))
        }
        Err(FrameError::Empty) => {
            debug!("Connection closed without a request");
            None
        }
        Err(e) => {
            warn!("Dropping request: {}", e);
            e.into_response()
        }
    };

    if let Some(response) = response {
        info!(status = response.status_code, "Sending response");
        if let Err(e) = stream.write_all(&response.to_bytes()).await {
            warn!("Failed to write response: {}", e);
            return;
        }
    }

    if let Err(e) = stream.shutdown().await {
        debug!("Failed to shut down connection: {}", e);
    }
}
