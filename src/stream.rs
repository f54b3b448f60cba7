use std::io::BufRead;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Delay before reconnecting after the stream drops or errors.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Iterator over the `data:` payloads of a server-sent-event stream.
///
/// Frames are one or more `data:` lines terminated by a blank line;
/// multi-line data is joined with `\n`. Comments and non-data fields
/// (`event:`, `id:`, `retry:`) are skipped.
pub struct SseFrames<R: BufRead> {
    reader: R,
}

impl<R: BufRead> SseFrames<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for SseFrames<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut data: Vec<String> = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "push stream read failed");
                    return None;
                }
            }

            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                // Blank line ends the event; empty events carry no data.
                if !data.is_empty() {
                    return Some(data.join("\n"));
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("data:") {
                data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
            // Everything else (comments, event/id/retry fields) is ignored.
        }
    }
}

/// Worker that keeps a push-stream connection open and forwards decoded
/// payloads over a channel, reconnecting with a fixed delay on error.
pub struct PushReader {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

impl PushReader {
    /// Connect to `url` on a worker thread and forward each payload to
    /// `events`. The worker ends when stopped or when the receiving side
    /// goes away.
    pub fn spawn(url: String, events: Sender<String>) -> Self {
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let join = std::thread::spawn(move || stream_loop(&url, &events, &stop_rx));
        Self { stop_tx, join }
    }

    /// Stop the worker. A read blocked on a silent connection only notices
    /// after the next frame or disconnect.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join.join();
    }
}

fn stream_loop(url: &str, events: &Sender<String>, stop_rx: &Receiver<()>) {
    // Streaming connection: no overall timeout, it would cut the stream.
    let client = match reqwest::blocking::Client::builder()
        .timeout(None)
        .user_agent("restream-tracker")
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "push stream client init failed");
            return;
        }
    };

    loop {
        if stop_rx.try_recv().is_ok() {
            return;
        }

        match client.get(url).send() {
            Ok(response) if response.status().is_success() => {
                let frames = SseFrames::new(std::io::BufReader::new(response));
                for payload in frames {
                    if stop_rx.try_recv().is_ok() {
                        return;
                    }
                    if events.send(payload).is_err() {
                        // Receiver gone, nothing left to feed.
                        return;
                    }
                }
                tracing::warn!(url, "push stream ended, reconnecting");
            }
            Ok(response) => {
                tracing::warn!(url, status = %response.status(), "push stream rejected");
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "push stream connect failed");
            }
        }

        // Stop-aware reconnect delay.
        match stop_rx.recv_timeout(RECONNECT_DELAY) {
            Ok(()) => return,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}
