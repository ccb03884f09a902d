//! Control channel over TCP
//!
//! Formats outgoing control requests and parses responses. Request layout:
//!
//! ```text
//! SETUP rtsp://host:port/media RTSP/1.0
//! CSeq: 1
//! Transport: RTP/UDP; client_port= 25000
//! ```
//!
//! Non-SETUP requests carry `Session: <id>` instead of the Transport line.
//! Responses are a status line (`RTSP/1.0 200 OK`) followed by headers up to
//! a blank line. A non-200 code is returned as data; only an unparseable
//! status line is an error.

use crate::session::{ControlRequest, ControlResponse, ControlTransport, Method};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Format one control request as wire text
pub fn format_request(request: &ControlRequest, host: &str, port: u16) -> String {
    let mut text = format!(
        "{} rtsp://{}:{}/{} RTSP/1.0\r\nCSeq: {}\r\n",
        request.method, host, port, request.media, request.cseq
    );
    match request.method {
        Method::Setup => {
            text.push_str(&format!(
                "Transport: RTP/UDP; client_port= {}\r\n",
                request.client_rtp_port
            ));
        }
        _ => {
            text.push_str(&format!("Session: {}\r\n", request.session_id));
        }
    }
    text.push_str("\r\n");
    text
}

/// Parse a response status line, e.g. `RTSP/1.0 200 OK`
pub fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| Error::Protocol("empty response status line".into()))?;
    if !version.starts_with("RTSP/") {
        return Err(Error::Protocol(format!(
            "unexpected protocol in status line: {line:?}"
        )));
    }
    let code = parts
        .next()
        .ok_or_else(|| Error::Protocol(format!("status line without code: {line:?}")))?;
    code.parse::<u16>()
        .map_err(|_| Error::Protocol(format!("non-numeric status code: {line:?}")))
}

/// Parse a full response (status line plus headers up to a blank line)
///
/// Unknown headers are ignored; `CSeq` and `Session` values that fail to
/// parse are treated as absent.
pub fn parse_response(text: &str) -> Result<ControlResponse> {
    let mut lines = text.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| Error::Protocol("empty response".into()))?;
    let status = parse_status_line(status_line)?;

    let mut cseq = None;
    let mut session_id = None;
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("cseq") {
                cseq = value.parse().ok();
            } else if name.eq_ignore_ascii_case("session") {
                session_id = value.parse().ok();
            }
        }
    }

    Ok(ControlResponse {
        status,
        cseq,
        session_id,
    })
}

/// TCP control transport
pub struct RtspTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    host: String,
    port: u16,
}

impl RtspTransport {
    /// Connect to the session-control server
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        debug!("control channel connected to {}:{}", host, port);
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            host: host.to_string(),
            port,
        })
    }

    async fn read_response_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(Error::Transport(
                    "control connection closed mid-response".into(),
                ));
            }
            let done = line.trim().is_empty() && !text.is_empty();
            text.push_str(&line);
            if done {
                return Ok(text);
            }
        }
    }
}

#[async_trait]
impl ControlTransport for RtspTransport {
    async fn send_request(&mut self, request: &ControlRequest) -> Result<()> {
        let text = format_request(request, &self.host, self.port);
        trace!("control request:\n{}", text);
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv_response(&mut self) -> Result<ControlResponse> {
        let text = self.read_response_text().await?;
        trace!("control response:\n{}", text);
        parse_response(&text)
    }
}
