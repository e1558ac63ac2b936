// wire.rs — Length-prefixed JSON frames on stdio.
//
// Every frame is a u32 little-endian byte count followed by that many bytes of
// JSON. Reading a frame and decoding it are separate steps: a frame that fails
// to decode has still been consumed in full, so the stream stays in sync and
// the host can answer it and move on.

use std::io::{ErrorKind, Read, Write};

use anyhow::{bail, Context};
use serde_json::Value;

use crate::{config, protocol::Request};

/// An intact frame whose payload is not a valid request.
#[derive(Debug)]
pub struct MalformedRequest {
    /// Best-effort request id; empty when none could be recovered.
    pub id: String,
    pub reason: String,
}

/// Read one frame's payload. `Ok(None)` means the peer closed the stream
/// between frames. Any error leaves the stream out of sync.
pub fn read_frame(input: &mut dyn Read) -> anyhow::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match input.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => bail!("stream closed inside length prefix ({filled} of 4 bytes)"),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed reading frame length"),
        }
    }

    let len = u32::from_le_bytes(prefix);
    if len > config::wire::MAX_MESSAGE_SIZE_BYTES {
        bail!("frame too large: {len} bytes (limit {})", config::wire::MAX_MESSAGE_SIZE_BYTES);
    }

    let mut payload = vec![0u8; len as usize];
    input
        .read_exact(&mut payload)
        .with_context(|| format!("stream closed inside {len}-byte frame"))?;
    Ok(Some(payload))
}

/// Decode a frame payload into a `Request`.
pub fn decode_request(payload: &[u8]) -> Result<Request, MalformedRequest> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| MalformedRequest {
        id: String::new(),
        reason: format!("request is not valid JSON: {e}"),
    })?;

    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    serde_json::from_value(value).map_err(|e| MalformedRequest {
        id,
        reason: format!("malformed request: {e}"),
    })
}

/// Serialize `v` and write it as one frame.
pub fn write_json(output: &mut dyn Write, v: &Value) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(v).context("failed serializing JSON response")?;
    let len = u32::try_from(bytes.len()).context("response does not fit a u32 length prefix")?;
    output.write_all(&len.to_le_bytes())?;
    output.write_all(&bytes)?;
    output.flush().context("failed flushing stdout")?;
    Ok(())
}
