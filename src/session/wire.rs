//! Line codec for the referee protocol.
//!
//! Every message is newline-terminated ASCII with whitespace-separated
//! fields:
//!
//! ```text
//! name
//! instance <name> <edgeCount>
//! result <k>     followed by k lines: <source> <sink> <owner> <bidCount> <price> <amount>
//! end <k>        followed by k lines: <owner> <value>
//! ```
//!
//! Replies are `name <player>` and a bid pack (`bid` then `<source> <sink> <price>`).

use crate::core::bid::{Bid, BidPack};
use crate::core::owner::OwnerId;
use crate::core::round::{Match, ProfitRecord};
use crate::core::stream::{Flow, Stream};
use std::io::{self, BufRead};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("wrong number of fields ({expected}): {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("error parsing {field}: '{value}' is not an integer")]
    BadInteger { field: &'static str, value: String },

    #[error("error parsing {field}: '{value}' is not a number")]
    BadReal { field: &'static str, value: String },

    #[error("expected '{expected}' header, got '{found}'")]
    BadHeader { expected: &'static str, found: String },

    #[error("connection closed after {read} of {expected} lines")]
    ShortRead { expected: usize, read: usize },

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Transport failures end the session; everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WireError::ShortRead { .. } | WireError::Io(_))
    }
}

/// First-token classification of an incoming line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Name,
    Instance,
    Result,
    End,
    Unknown,
}

impl Command {
    pub fn classify(line: &str) -> Self {
        if line == "name" {
            Command::Name
        } else if line.starts_with("instance") {
            Command::Instance
        } else if line.starts_with("result") {
            Command::Result
        } else if line.starts_with("end") {
            Command::End
        } else {
            Command::Unknown
        }
    }
}

fn fields(line: &str, expected: usize) -> Result<Vec<&str>, WireError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(WireError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn integer<T: FromStr>(field: &'static str, value: &str) -> Result<T, WireError> {
    value.parse().map_err(|_| WireError::BadInteger {
        field,
        value: value.to_string(),
    })
}

fn real(field: &'static str, value: &str) -> Result<f64, WireError> {
    value.parse().map_err(|_| WireError::BadReal {
        field,
        value: value.to_string(),
    })
}

/// Parse `instance <name> <edgeCount>`.
pub fn parse_match(line: &str) -> Result<Match, WireError> {
    let f = fields(line, 3)?;
    Ok(Match::new(f[1], integer("number of edges", f[2])?))
}

/// Parse a block header such as `result <k>` or `end <k>`, returning `k`.
pub fn parse_count_header(line: &str) -> Result<usize, WireError> {
    let f = fields(line, 2)?;
    integer("block size", f[1])
}

/// Parse `<source> <sink> <owner> <bidCount> <price> <amount>`.
pub fn parse_stream(line: &str) -> Result<Stream, WireError> {
    let f = fields(line, 6)?;
    Ok(Stream::new(
        integer("result source", f[0])?,
        integer("result sink", f[1])?,
        real("result amount", f[5])?,
        OwnerId::new(f[2]),
        real("result price", f[4])?,
        integer("result number of bids", f[3])?,
    ))
}

pub fn format_stream(stream: &Stream) -> String {
    format!(
        "{} {} {} {} {} {}",
        stream.source, stream.sink, stream.owner, stream.bid_count, stream.price, stream.amount
    )
}

/// Render a complete `result` block, header included.
pub fn format_flow(flow: &Flow) -> String {
    let mut out = format!("result {}\n", flow.len());
    for stream in flow.streams() {
        out.push_str(&format_stream(stream));
        out.push('\n');
    }
    out
}

/// Render a complete `end` block, header included.
pub fn format_profits(profits: &[ProfitRecord]) -> String {
    let mut out = format!("end {}\n", profits.len());
    for profit in profits {
        out.push_str(&format!("{} {}\n", profit.owner, profit.value));
    }
    out
}

/// Parse `<owner> <value>`.
pub fn parse_profit(line: &str) -> Result<ProfitRecord, WireError> {
    let f = fields(line, 2)?;
    Ok(ProfitRecord::new(OwnerId::new(f[0]), real("profit value", f[1])?))
}

/// Parse `<source> <sink> <price>`.
pub fn parse_bid(line: &str) -> Result<Bid, WireError> {
    let f = fields(line, 3)?;
    Ok(Bid::new(
        integer("bid source", f[0])?,
        integer("bid sink", f[1])?,
        real("bid price", f[2])?,
    ))
}

/// Parse a full bid reply: the `bid` header and one bid per following line.
pub fn parse_bid_pack(text: &str) -> Result<BidPack, WireError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    match lines.next() {
        Some("bid") => {}
        other => {
            return Err(WireError::BadHeader {
                expected: "bid",
                found: other.unwrap_or_default().to_string(),
            })
        }
    }
    lines.map(parse_bid).collect()
}

/// Read one line, trimmed. `Ok(None)` at end of stream.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
/// garbled line reaches the parser and is skipped like any other bad line.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, WireError> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
}

/// Read exactly `count` lines and parse each with `parse`.
///
/// Stops at the first malformed line. Running out of input is reported as
/// [`WireError::ShortRead`].
pub fn read_block<R, T, F>(reader: &mut R, count: usize, parse: F) -> Result<Vec<T>, WireError>
where
    R: BufRead,
    F: Fn(&str) -> Result<T, WireError>,
{
    // `count` comes off the wire; grow as lines actually arrive.
    let mut items = Vec::new();
    for read in 0..count {
        let line = read_line(reader)?.ok_or(WireError::ShortRead {
            expected: count,
            read,
        })?;
        items.push(parse(&line)?);
    }
    Ok(items)
}

/// Parse a `result <k>` header and its `k` stream lines.
pub fn read_flow<R: BufRead>(header: &str, reader: &mut R) -> Result<Flow, WireError> {
    let count = parse_count_header(header)?;
    Ok(Flow::new(read_block(reader, count, parse_stream)?))
}

/// Parse an `end <k>` header and its `k` profit lines.
pub fn read_profits<R: BufRead>(
    header: &str,
    reader: &mut R,
) -> Result<Vec<ProfitRecord>, WireError> {
    let count = parse_count_header(header)?;
    read_block(reader, count, parse_profit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_classify() {
        assert_eq!(Command::classify("name"), Command::Name);
        assert_eq!(Command::classify("instance N1 3"), Command::Instance);
        assert_eq!(Command::classify("result 2"), Command::Result);
        assert_eq!(Command::classify("end 1"), Command::End);
        assert_eq!(Command::classify("names"), Command::Unknown);
        assert_eq!(Command::classify("hello"), Command::Unknown);
    }

    #[test]
    fn test_parse_match() {
        assert_eq!(parse_match("instance N104 5").unwrap(), Match::new("N104", 5));
        assert!(matches!(
            parse_match("instance N104"),
            Err(WireError::FieldCount { expected: 3, found: 2 })
        ));
        assert!(matches!(
            parse_match("instance N104 -1"),
            Err(WireError::BadInteger { .. })
        ));
    }

    #[test]
    fn test_parse_stream_field_order() {
        let stream = parse_stream("1 2 Alice 3 8.5 1.25").unwrap();
        assert_eq!(stream, Stream::new(1, 2, 1.25, OwnerId::new("Alice"), 8.5, 3));
    }

    #[test]
    fn test_stream_line_round_trip() {
        let stream = Stream::new(4, 7, 1.0 / 3.0, OwnerId::new("B"), 12.345, 2);
        assert_eq!(parse_stream(&format_stream(&stream)).unwrap(), stream);
    }

    #[test]
    fn test_bad_real() {
        assert!(matches!(
            parse_stream("1 2 A 3 cheap 1.0"),
            Err(WireError::BadReal { field: "result price", .. })
        ));
    }

    #[test]
    fn test_bid_pack_round_trip() {
        let mut pack = BidPack::new();
        pack.bid(1, 1, 8.0);
        pack.bid(3, 2, 15.5);
        assert_eq!(parse_bid_pack(&pack.to_string()).unwrap(), pack);
        assert!(parse_bid_pack(&BidPack::empty().to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_read_flow() {
        let mut input = Cursor::new("1 1 A 2 8.0 1.5\n1 2 C 1 15.0 2.0\nname\n");
        let flow = read_flow("result 2", &mut input).unwrap();
        assert_eq!(flow.len(), 2);
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("name"));
    }

    #[test]
    fn test_short_read_is_fatal() {
        let mut input = Cursor::new("1 1 A 2 8.0 1.5\n");
        let err = read_flow("result 3", &mut input).unwrap_err();
        assert!(matches!(err, WireError::ShortRead { expected: 3, read: 1 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_utf8_line_is_not_fatal() {
        let mut input = Cursor::new(&b"\xff\xfe garbage\ninstance N 3\n"[..]);
        let garbled = read_line(&mut input).unwrap().unwrap();
        assert!(garbled.ends_with("garbage"));
        assert_eq!(Command::classify(&garbled), Command::Unknown);
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("instance N 3"));
        assert!(read_line(&mut input).unwrap().is_none());
    }

    #[test]
    fn test_huge_block_count_reads_lazily() {
        let mut input = Cursor::new("1 1 A 2 8.0 1.5\n");
        let header = format!("result {}", usize::MAX);
        let err = read_flow(&header, &mut input).unwrap_err();
        assert!(matches!(err, WireError::ShortRead { read: 1, .. }));
    }

    #[test]
    fn test_malformed_line_is_recoverable() {
        let mut input = Cursor::new("1 1 A\n");
        let err = read_flow("result 1", &mut input).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_formatted_flow_reads_back() {
        let flow = Flow::new(vec![
            Stream::new(1, 1, 1.5, OwnerId::new("A"), 8.0, 2),
            Stream::new(1, 2, 2.0, OwnerId::new("C"), 15.0, 1),
        ]);
        let text = format_flow(&flow);
        let mut reader = Cursor::new(text);
        let header = read_line(&mut reader).unwrap().unwrap();
        assert_eq!(read_flow(&header, &mut reader).unwrap(), flow);
    }

    #[test]
    fn test_read_profits() {
        let mut input = Cursor::new("Parallax 120.5\nOther -3\n");
        let profits = read_profits("end 2", &mut input).unwrap();
        assert_eq!(profits[1], ProfitRecord::new(OwnerId::new("Other"), -3.0));
    }
}
