//! Tracing setup. While the TUI owns the terminal, formatted events go to a
//! channel that feeds the logs panel instead of stderr.

use std::io;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_FILTER: &str = "info,chant_cli=info,chant_audio=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stderr (non-interactive commands).
pub(crate) fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

/// Log into a channel; the receiver yields one formatted line per item.
pub(crate) fn init_channel() -> Receiver<String> {
    let (tx, rx) = unbounded();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_target(false)
        .with_writer(ChannelMakeWriter(tx))
        .init();
    rx
}

#[derive(Clone)]
struct ChannelMakeWriter(Sender<String>);

impl<'a> MakeWriter<'a> for ChannelMakeWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            tx: self.0.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one event and sends its lines when dropped.
struct LineWriter {
    tx: Sender<String>,
    buf: Vec<u8>,
}

impl io::Write for LineWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let _ = self.tx.send(line.trim_end().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writer_sends_each_line_on_drop() {
        let (tx, rx) = unbounded();
        let make = ChannelMakeWriter(tx);
        {
            let mut w = make.make_writer();
            w.write_all(b"first  \nsecond\n\n").unwrap();
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(rx.try_recv().unwrap(), "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn writer_survives_closed_channel() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut w = ChannelMakeWriter(tx).make_writer();
        w.write_all(b"ignored\n").unwrap();
        drop(w);
    }
}
