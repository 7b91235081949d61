//! Reading timed words and pushing their events into a monitor.

use std::io::BufRead;
use std::marker::PhantomData;

use anyhow::{bail, Context, Result};
use symon::core::{parse_decimal, Rational};
use symon::monitor::Event;
use symon::pipeline::SingleSubject;

use crate::signature::Signature;

/// Parsing of one whitespace-separated payload or timestamp token.
pub trait ParseToken: Sized {
    fn parse_token(token: &str) -> Result<Self>;
}

impl ParseToken for f64 {
    fn parse_token(token: &str) -> Result<Self> {
        token.parse().with_context(|| format!("invalid number `{token}`"))
    }
}

impl ParseToken for Rational {
    fn parse_token(token: &str) -> Result<Self> {
        Ok(parse_decimal(token)?)
    }
}

/// A whitespace tokenizer that can drop the remainder of the current line.
struct Tokens<R> {
    reader: R,
    line: String,
    pos: usize,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Tokens {
            reader,
            line: String::new(),
            pos: 0,
        }
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            let rest = &self.line[self.pos..];
            let trimmed = rest.trim_start();
            if !trimmed.is_empty() {
                self.pos = self.line.len() - trimmed.len();
                let end = trimmed
                    .find(char::is_whitespace)
                    .map(|i| self.pos + i)
                    .unwrap_or(self.line.len());
                let token = self.line[self.pos..end].to_string();
                self.pos = end;
                return Ok(Some(token));
            }
            self.line.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.line).context("reading timed word")? == 0 {
                return Ok(None);
            }
        }
    }

    fn skip_rest_of_line(&mut self) {
        self.pos = self.line.len();
    }
}

/// Parses a timed word event by event against a signature.
///
/// A record is `<action> <strings…> <numbers…> <timestamp>`. Records with an
/// unknown action are reported and the rest of their line is skipped.
pub struct TimedWordReader<R, N, T> {
    tokens: Tokens<R>,
    signature: Signature,
    _payload: PhantomData<(N, T)>,
}

impl<R: BufRead, N: ParseToken, T: ParseToken> TimedWordReader<R, N, T> {
    pub fn new(reader: R, signature: Signature) -> Self {
        TimedWordReader {
            tokens: Tokens::new(reader),
            signature,
            _payload: PhantomData,
        }
    }

    fn required_token(&mut self, what: &str) -> Result<String> {
        match self.tokens.next_token()? {
            Some(token) => Ok(token),
            None => bail!("unexpected end of input while reading {what}"),
        }
    }

    pub fn next_event(&mut self) -> Result<Option<Event<N, T>>> {
        loop {
            let Some(action_name) = self.tokens.next_token()? else {
                return Ok(None);
            };
            let Some(info) = self.signature.get(&action_name).copied() else {
                tracing::warn!("undefined action `{action_name}`; skipping the rest of the line");
                eprintln!("Undefined action: {action_name}");
                self.tokens.skip_rest_of_line();
                continue;
            };
            let mut strings = Vec::with_capacity(info.string_arity);
            for _ in 0..info.string_arity {
                strings.push(self.required_token("a string payload")?);
            }
            let mut numbers = Vec::with_capacity(info.number_arity);
            for _ in 0..info.number_arity {
                let token = self.required_token("a number payload")?;
                numbers.push(N::parse_token(&token)?);
            }
            let token = self.required_token("a timestamp")?;
            let timestamp = T::parse_token(&token)?;
            return Ok(Some(Event {
                action: info.action,
                strings,
                numbers,
                timestamp,
            }));
        }
    }
}

/// Reads a whole timed word and notifies the registered observer for each
/// event in order.
pub struct TimedWordSource<R, N, T> {
    reader: TimedWordReader<R, N, T>,
    pub events: SingleSubject<Event<N, T>>,
}

impl<R: BufRead, N: ParseToken, T: ParseToken> TimedWordSource<R, N, T> {
    pub fn new(reader: R, signature: Signature) -> Self {
        TimedWordSource {
            reader: TimedWordReader::new(reader, signature),
            events: SingleSubject::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        while let Some(event) = self.reader.next_event()? {
            self.events.notify(&event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> Signature {
        Signature::from_entries(vec![
            ("update".to_string(), 1, 1),
            ("ping".to_string(), 0, 0),
        ])
    }

    fn reader(input: &str) -> TimedWordReader<&[u8], f64, f64> {
        TimedWordReader::new(input.as_bytes(), signature())
    }

    #[test]
    fn reads_records_across_lines() {
        let mut r = reader("update x 100\n0.1 update y\n200 10.0\n");
        let first = r.next_event().unwrap().unwrap();
        assert_eq!(first.strings, vec!["x"]);
        assert_eq!(first.numbers, vec![100.0]);
        assert_eq!(first.timestamp, 0.1);
        let second = r.next_event().unwrap().unwrap();
        assert_eq!(second.strings, vec!["y"]);
        assert_eq!(second.timestamp, 10.0);
        assert!(r.next_event().unwrap().is_none());
    }

    #[test]
    fn unknown_action_skips_its_line() {
        let mut r = reader("bogus update x 1 1.0\nping 2.0\n");
        let event = r.next_event().unwrap().unwrap();
        assert_eq!(event.action, symon::core::Action(1));
        assert_eq!(event.timestamp, 2.0);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut r = reader("update x 100");
        assert!(r.next_event().is_err());
    }

    #[test]
    fn rational_timestamps() {
        let mut r: TimedWordReader<&[u8], Rational, Rational> =
            TimedWordReader::new("update x 2.5 4.45\n".as_bytes(), signature());
        let event = r.next_event().unwrap().unwrap();
        assert_eq!(event.numbers[0], parse_decimal("2.5").unwrap());
        assert_eq!(event.timestamp, parse_decimal("4.45").unwrap());
    }
}
