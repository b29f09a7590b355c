//! Argument splitting shared by built-ins and plugins.

use std::io;

use crate::Streams;

/// Message for an argument-count mismatch, without the `Error: ` prefix.
pub fn arity_message(expected: usize, found: usize) -> String {
    if expected == 1 {
        format!("expected 1 argument, found {found}")
    } else {
        format!("expected {expected} arguments, found {found}")
    }
}

/// Shell-split `args` and require exactly `expected` words.
///
/// On a quoting error or a count mismatch the problem is written to the
/// error stream and `Ok(None)` is returned; the caller just stops.
pub fn split_exact(
    args: &str,
    expected: usize,
    streams: &mut Streams,
) -> io::Result<Option<Vec<String>>> {
    let Some(words) = split_words(args, streams)? else {
        return Ok(None);
    };
    if words.len() != expected {
        streams.report_error(arity_message(expected, words.len()))?;
        return Ok(None);
    }
    Ok(Some(words))
}

/// Shell-split `args`, reporting unterminated quotes to the error stream.
pub fn split_words(args: &str, streams: &mut Streams) -> io::Result<Option<Vec<String>>> {
    match shell_words::split(args) {
        Ok(words) => Ok(Some(words)),
        Err(e) => {
            streams.report_error(e)?;
            Ok(None)
        }
    }
}
