//! Unit delivery over UDP
//!
//! Parses the RTP fixed header (RFC 3550 §5.1): 12 bytes of version,
//! flags, payload type, sequence number, timestamp, and SSRC, optionally
//! followed by CSRC entries. The payload is everything after the header.
//! Header extensions are not expected from the unit server and are treated
//! as payload.

use crate::session::{MediaUnit, UnitSource};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

/// Only RTP version 2 is accepted
pub const RTP_VERSION: u8 = 2;
/// Fixed header length without CSRC entries
pub const RTP_HEADER_LEN: usize = 12;

const MAX_DATAGRAM: usize = 65536;

/// Parse one datagram into a media unit
pub fn parse_unit(datagram: &[u8]) -> Result<MediaUnit> {
    if datagram.len() < RTP_HEADER_LEN {
        return Err(Error::Protocol(format!(
            "datagram too short for unit header: {} bytes",
            datagram.len()
        )));
    }

    let version = datagram[0] >> 6;
    if version != RTP_VERSION {
        return Err(Error::Protocol(format!(
            "unsupported unit header version {version}"
        )));
    }

    let csrc_count = (datagram[0] & 0x0f) as usize;
    let header_len = RTP_HEADER_LEN + 4 * csrc_count;
    if datagram.len() < header_len {
        return Err(Error::Protocol(
            "datagram truncated inside CSRC list".into(),
        ));
    }

    let sequence = u16::from_be_bytes([datagram[2], datagram[3]]);
    let timestamp = u32::from_be_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]);

    Ok(MediaUnit {
        sequence,
        timestamp,
        payload: datagram[header_len..].to_vec(),
    })
}

/// UDP unit source bound to the negotiated client port
pub struct RtpUnitSource {
    port: u16,
    socket: Option<UdpSocket>,
    buf: Vec<u8>,
}

impl RtpUnitSource {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            socket: None,
            buf: vec![0u8; MAX_DATAGRAM],
        }
    }
}

#[async_trait]
impl UnitSource for RtpUnitSource {
    async fn setup(&mut self) -> Result<()> {
        // Idempotent: a retried SETUP keeps the existing binding
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind(("0.0.0.0", self.port)).await?;
        debug!("unit delivery socket bound on port {}", self.port);
        self.socket = Some(socket);
        Ok(())
    }

    async fn recv(&mut self) -> Result<MediaUnit> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::Transport("unit source not set up".into()))?;
        let (len, _peer) = socket.recv_from(&mut self.buf).await?;
        parse_unit(&self.buf[..len])
    }
}
