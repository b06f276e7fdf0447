// UDP transport: one socket, one remote appliance.
//
// Sends are fire-and-forget; receive only yields datagrams whose source
// IP matches the configured appliance address.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::error::Error;

/// Largest datagram the appliances emit, with headroom.
const MAX_DATAGRAM: usize = 4096;

/// A bound UDP socket paired with the appliance address it talks to.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port suited to `remote`'s address family.
    ///
    /// Broadcast is enabled on IPv4 so that `remote` may be a subnet
    /// broadcast address while scanning.
    pub async fn open(remote: SocketAddr) -> Result<Self, Error> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        if remote.is_ipv4() {
            socket.set_broadcast(true)?;
        }

        tracing::debug!(local = %socket.local_addr()?, %remote, "socket bound");
        Ok(Self { socket, remote })
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Send a datagram to the appliance. Failures are logged, never returned.
    pub async fn send(&self, datagram: &[u8]) {
        match self.socket.send_to(datagram, self.remote).await {
            Ok(len) => tracing::trace!(len, remote = %self.remote, "datagram sent"),
            Err(e) => tracing::warn!(error = %e, remote = %self.remote, "send failed"),
        }
    }

    /// Wait for the next datagram from the appliance.
    ///
    /// Cancel-safe: dropping the future never loses an accepted datagram.
    pub async fn recv(&self) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            if !self.accepts(from) {
                tracing::trace!(%from, "dropping datagram from unexpected sender");
                continue;
            }
            buf.truncate(len);
            return Ok(buf);
        }
    }

    /// Source filter: only the appliance's IP is accepted. The source port
    /// is not compared.
    pub fn accepts(&self, from: SocketAddr) -> bool {
        from.ip() == self.remote.ip()
    }
}
