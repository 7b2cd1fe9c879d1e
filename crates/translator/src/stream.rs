use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Default)]
pub(crate) struct Capture {
    pub(crate) bytes: Vec<u8>,
    pub(crate) truncated: bool,
}

impl Capture {
    pub(crate) fn into_text(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Reads `reader` to EOF, keeping at most `max_bytes`. The rest is drained so
/// the child never blocks on a full pipe.
pub(crate) async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    max_bytes: usize,
) -> io::Result<Capture> {
    let mut capture = Capture::default();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = max_bytes.saturating_sub(capture.bytes.len());
        let keep = room.min(n);
        capture.bytes.extend_from_slice(&chunk[..keep]);
        if keep < n {
            capture.truncated = true;
        }
    }
    Ok(capture)
}
