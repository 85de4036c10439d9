//! Datagram encoding.
//!
//! Both directions carry `<seq>,<payload>` in ASCII: the payload is the
//! service name in a request and `host:port` (or nothing) in a response.
//! The first comma separates the two parts.

use thiserror::Error;

pub const SEPARATOR: u8 = b',';

/// Errors produced while decoding a datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("datagram has no ',' separator")]
    MissingSeparator,

    #[error("sequence '{0}' is not an unsigned integer")]
    InvalidSequence(String),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

/// A name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub seq: u64,
    pub name: &'a str,
}

/// The answer to a lookup; `addr` is empty when nothing is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub seq: u64,
    pub addr: &'a str,
}

impl<'a> Request<'a> {
    pub fn encode(&self) -> Vec<u8> {
        encode(self.seq, self.name)
    }

    pub fn decode(body: &'a [u8]) -> Result<Self, ProtocolError> {
        let (seq, name) = decode(body)?;
        Ok(Self { seq, name })
    }
}

impl<'a> Response<'a> {
    pub fn encode(&self) -> Vec<u8> {
        encode(self.seq, self.addr)
    }

    pub fn decode(body: &'a [u8]) -> Result<Self, ProtocolError> {
        let (seq, addr) = decode(body)?;
        Ok(Self { seq, addr })
    }
}

/// Split at the first separator.
pub fn split_body(body: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = body.iter().position(|b| *b == SEPARATOR)?;
    Some((&body[..pos], &body[pos + 1..]))
}

fn encode(seq: u64, payload: &str) -> Vec<u8> {
    let seq = seq.to_string();
    let mut body = Vec::with_capacity(seq.len() + 1 + payload.len());
    body.extend_from_slice(seq.as_bytes());
    body.push(SEPARATOR);
    body.extend_from_slice(payload.as_bytes());
    body
}

fn decode(body: &[u8]) -> Result<(u64, &str), ProtocolError> {
    let (seq, payload) = split_body(body).ok_or(ProtocolError::MissingSeparator)?;
    let seq_text = std::str::from_utf8(seq).map_err(|_| ProtocolError::InvalidUtf8)?;
    let seq = seq_text
        .parse::<u64>()
        .map_err(|_| ProtocolError::InvalidSequence(seq_text.to_string()))?;
    let payload = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok((seq, payload))
}
