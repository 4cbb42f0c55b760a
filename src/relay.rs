use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Forwards `source` line by line to `out`, then signals `done` exactly once.
///
/// Line terminators (`\n` or `\r\n`) are stripped and invalid UTF-8 is replaced.
/// Relaying stops at end of stream, on a read error, or when `out` is closed.
pub async fn relay_lines<R>(source: R, out: mpsc::Sender<String>, done: mpsc::Sender<()>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(strip_line_ending(&buf)).into_owned();
                if out.send(line).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                log::debug!("stopped relaying stream: {err}");
                break;
            }
        }
    }

    let _ = done.send(()).await;
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
