/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt;
use std::fmt::Write;

/// Message of a parse which failed without a specific diagnostic.
pub const DEFAULT_PARSE_MESSAGE: &str = "unknown XML parsing error";

/// Upper bound of a single formatted diagnostic, in bytes.
pub const MESSAGE_LIMIT: usize = 512;

/// Diagnostic sink of a single parse or transform operation.
///
/// The channel starts optimistic: it reports success until an error is
/// recorded. Warnings are tracked separately and never affect the
/// status. Recording never fails.
///
/// # Examples
///
/// ```
/// use xmlwrap::ErrorChannel;
///
/// let mut channel = ErrorChannel::default();
/// assert!(channel.is_ok());
/// channel.record_warning(format_args!("odd"));
/// assert!(channel.is_ok() && channel.had_warnings());
/// channel.record_error(format_args!("bad tag {}\n", "x"));
/// assert!(!channel.is_ok());
/// assert_eq!(channel.message(), "bad tag x");
/// ```
#[derive(Clone, Debug)]
pub struct ErrorChannel {
    default_message: &'static str,
    message: String,
    warnings_seen: bool,
    ok: bool,
}

// Formats into a buffer which silently drops anything past the limit.
struct Bounded {
    buf: String,
}

impl Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = MESSAGE_LIMIT.saturating_sub(self.buf.len());
        if s.len() <= room {
            self.buf.push_str(s);
        } else {
            let mut end = room;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            self.buf.push_str(&s[..end]);
        }
        Ok(())
    }
}

fn format_bounded(args: fmt::Arguments<'_>) -> String {
    let mut bounded = Bounded { buf: String::new() };
    let _ = bounded.write_fmt(args);
    let mut text = bounded.buf;
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

impl ErrorChannel {
    /// Creates an optimistic channel holding the given default message.
    pub fn new(default_message: &'static str) -> ErrorChannel {
        ErrorChannel {
            default_message,
            message: default_message.to_string(),
            warnings_seen: false,
            ok: true,
        }
    }

    /// Records an error, replacing any previous message.
    pub fn record_error(&mut self, args: fmt::Arguments<'_>) {
        self.ok = false;
        let text = format_bounded(args);
        if !text.is_empty() {
            self.message = text;
        }
    }

    /// Records an error, keeping the previous messages of this operation.
    ///
    /// Messages are separated by newlines.
    pub fn append_error(&mut self, args: fmt::Arguments<'_>) {
        self.ok = false;
        let text = format_bounded(args);
        if text.is_empty() {
            return;
        }
        if !self.message.is_empty() {
            self.message.push('\n');
        }
        self.message.push_str(&text);
    }

    pub fn record_warning(&mut self, args: fmt::Arguments<'_>) {
        log::debug!("warning: {}", format_bounded(args));
        self.warnings_seen = true;
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn had_warnings(&self) -> bool {
        self.warnings_seen
    }

    /// Whether no error text replaced the default message yet.
    pub fn is_default_message(&self) -> bool {
        self.message == self.default_message
    }

    pub(crate) fn set_message(&mut self, message: String) {
        self.ok = false;
        self.message = message;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.ok = false;
    }

    /// Returns the channel to its optimistic initial state.
    pub fn reset(&mut self) {
        self.ok = true;
        self.warnings_seen = false;
        self.message.clear();
        self.message.push_str(self.default_message);
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        ErrorChannel::new(DEFAULT_PARSE_MESSAGE)
    }
}

#[cfg(test)]
mod tests;
