use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};

pub const LISTEN_BACKLOG: i32 = 10;

// The configured host is never resolved: loopback names bind to 127.0.0.1,
// anything else binds to every IPv4 interface.
pub fn bind_address(host: &str, port: u16) -> SocketAddr {
    let ip = match host {
        "localhost" | "127.0.0.1" => Ipv4Addr::LOCALHOST,
        _ => Ipv4Addr::UNSPECIFIED,
    };
    SocketAddr::from((ip, port))
}

pub fn create_listener(
    host: &str,
    port: u16,
) -> std::io::Result<(SocketAddr, tokio::net::TcpListener)> {
    let addr = bind_address(host, port);
    tracing::info!("Attempting to bind server to {} (configured host: {})...", addr, host);

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    // Make it non-blocking for tokio
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    let tokio_listener = tokio::net::TcpListener::from_std(std_listener)?;
    let local_addr = tokio_listener.local_addr()?;

    Ok((local_addr, tokio_listener))
}
