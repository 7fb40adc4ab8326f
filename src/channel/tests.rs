/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;

#[test]
fn starts_optimistic() {
    let channel = ErrorChannel::default();
    assert!(channel.is_ok());
    assert!(!channel.had_warnings());
    assert_eq!(channel.message(), DEFAULT_PARSE_MESSAGE);
    assert!(channel.is_default_message());
}

#[test]
fn last_error_wins() {
    let mut channel = ErrorChannel::default();
    channel.record_error(format_args!("first"));
    channel.record_error(format_args!("second {}", 2));
    assert!(!channel.is_ok());
    assert_eq!(channel.message(), "second 2");
    assert!(!channel.is_default_message());
}

#[test]
fn appended_errors_are_joined() {
    let mut channel = ErrorChannel::new("");
    channel.append_error(format_args!("one\n"));
    channel.append_error(format_args!("two"));
    assert_eq!(channel.message(), "one\ntwo");
}

#[test]
fn empty_text_keeps_message_but_fails() {
    let mut channel = ErrorChannel::default();
    channel.record_error(format_args!(""));
    assert!(!channel.is_ok());
    assert!(channel.is_default_message());

    let mut channel = ErrorChannel::new("");
    channel.append_error(format_args!("\n"));
    assert!(!channel.is_ok());
    assert_eq!(channel.message(), "");
}

#[test]
fn single_trailing_newline_is_trimmed() {
    let mut channel = ErrorChannel::default();
    channel.record_error(format_args!("text\n\n"));
    assert_eq!(channel.message(), "text\n");
}

#[test]
fn messages_are_bounded() {
    let mut channel = ErrorChannel::default();
    let long = "x".repeat(MESSAGE_LIMIT * 2);
    channel.record_error(format_args!("{}", long));
    assert_eq!(channel.message().len(), MESSAGE_LIMIT);

    // Truncation never splits a character.
    let wide = "ç".repeat(MESSAGE_LIMIT);
    channel.record_error(format_args!("a{}", wide));
    assert!(channel.message().len() <= MESSAGE_LIMIT);
    assert!(channel.message().len() >= MESSAGE_LIMIT - 1);
}

#[test]
fn warnings_do_not_fail() {
    let mut channel = ErrorChannel::default();
    channel.record_warning(format_args!("careful"));
    assert!(channel.is_ok());
    assert!(channel.had_warnings());
}

#[test]
fn reset_restores_initial_state() {
    let mut channel = ErrorChannel::new("");
    channel.record_warning(format_args!("w"));
    channel.append_error(format_args!("e"));
    channel.reset();
    assert!(channel.is_ok());
    assert!(!channel.had_warnings());
    assert_eq!(channel.message(), "");
}
