use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Writes lines from both channels to their sinks as they arrive.
///
/// Lines from one channel keep their order. Lines from different channels are written in
/// arrival order with no further ordering. Each line is flushed immediately. Returns the
/// sinks once both channels are closed and drained.
///
/// # Errors
///
/// Returns the first write error. Both receivers are dropped with it, which makes
/// pending and future sends fail.
pub async fn multiplex<O, E>(
    mut stdout_rx: mpsc::Receiver<String>,
    mut stderr_rx: mpsc::Receiver<String>,
    mut stdout: O,
    mut stderr: E,
) -> std::io::Result<(O, E)>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            line = stdout_rx.recv(), if stdout_open => match line {
                Some(line) => write_line(&mut stdout, &line).await?,
                None => stdout_open = false,
            },
            line = stderr_rx.recv(), if stderr_open => match line {
                Some(line) => write_line(&mut stderr, &line).await?,
                None => stderr_open = false,
            },
        }
    }

    Ok((stdout, stderr))
}

async fn write_line<W>(sink: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(line.as_bytes()).await?;
    sink.write_all(b"\n").await?;
    sink.flush().await
}
