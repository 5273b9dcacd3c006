//! Line Stream Reader: turns an HTTP body into a lazy sequence of
//! newline-delimited lines, decoding UTF-8 incrementally and honoring a
//! per-read timeout and cancellation. JSON parsing/validation is the
//! Download Event Producer's job; this module only splits lines.

use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt;

use crate::cancel::CancelToken;
use crate::fetch::{ByteStream, FetchError};

#[derive(Debug, Clone)]
pub enum ReadError {
    Timeout,
    Transport(String),
    Cancelled,
}

pub struct LineStreamReader {
    body: ByteStream,
    byte_buf: Vec<u8>,
    text_buf: String,
    pending: VecDeque<String>,
    done: bool,
}

impl LineStreamReader {
    pub fn new(body: ByteStream) -> Self {
        LineStreamReader {
            body,
            byte_buf: Vec::new(),
            text_buf: String::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Returns the next non-empty line, or `None` at end of stream.
    pub async fn next_line(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<String>, ReadError> {
        loop {
            while let Some(line) = self.pending.pop_front() {
                if !line.is_empty() {
                    return Ok(Some(line));
                }
            }
            if self.done {
                return Ok(None);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ReadError::Cancelled),
                chunk = tokio::time::timeout(timeout, self.body.next()) => {
                    match chunk {
                        Err(_) => return Err(ReadError::Timeout),
                        Ok(None) => self.finish(),
                        Ok(Some(Ok(bytes))) => self.push_bytes(&bytes),
                        Ok(Some(Err(FetchError::Timeout))) => return Err(ReadError::Timeout),
                        Ok(Some(Err(FetchError::Transport(reason)))) => {
                            return Err(ReadError::Transport(reason))
                        }
                    }
                }
            }
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.byte_buf.extend_from_slice(bytes);
        let consumed = match std::str::from_utf8(&self.byte_buf) {
            Ok(s) => {
                self.text_buf.push_str(s);
                self.byte_buf.len()
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                // Safe: `valid_up_to` is, by definition, a valid UTF-8 boundary.
                let s = std::str::from_utf8(&self.byte_buf[..valid_up_to]).unwrap();
                self.text_buf.push_str(s);
                valid_up_to
            }
        };
        self.byte_buf.drain(..consumed);
        self.drain_lines();
    }

    fn finish(&mut self) {
        self.done = true;
        if !self.byte_buf.is_empty() {
            self.text_buf
                .push_str(&String::from_utf8_lossy(&self.byte_buf));
            self.byte_buf.clear();
        }
        self.drain_lines();
        if !self.text_buf.is_empty() {
            self.pending.push_back(std::mem::take(&mut self.text_buf));
        }
    }

    fn drain_lines(&mut self) {
        loop {
            let Some(idx) = self.text_buf.find(['\n', '\r']) else {
                break;
            };
            let mut skip = 1;
            if self.text_buf.as_bytes()[idx] == b'\r'
                && self.text_buf.len() > idx + 1
                && self.text_buf.as_bytes()[idx + 1] == b'\n'
            {
                skip = 2;
            }
            let line: String = self.text_buf[..idx].to_string();
            self.text_buf.drain(..idx + skip);
            self.pending.push_back(line);
        }
    }
}
