//! Pull-based incremental scanner over one JSON document
//!
//! Only unconsumed bytes are held in memory. Values are located with a small
//! byte-level state machine that tracks nesting depth and string escapes, so
//! a complete value can be handed to `serde_json` or dropped without ever
//! building a tree for the whole document.

use crate::error::{common, ErrorCode, ResultError};
use crate::source::ResponseSource;
use bytes::{Buf, Bytes, BytesMut};
use serde_json::Value;

type Result<T> = std::result::Result<T, ResultError>;

/// Progress through a single JSON value, kept across buffer refills
#[derive(Debug, Default)]
struct ValueScan {
    depth: usize,
    in_string: bool,
    escaped: bool,
    started: bool,
    scalar: bool,
    pos: usize,
}

enum Step {
    Continue,
    /// Value ends at this many bytes from the buffer start
    Done(usize),
}

impl ValueScan {
    fn step(&mut self, byte: u8, offset: u64) -> Result<Step> {
        let at = self.pos;
        self.pos += 1;

        if !self.started {
            self.started = true;
            return match byte {
                b'{' | b'[' => {
                    self.depth = 1;
                    Ok(Step::Continue)
                }
                b'"' => {
                    self.in_string = true;
                    Ok(Step::Continue)
                }
                b',' | b':' | b'}' | b']' => {
                    Err(common::unexpected_byte(offset + at as u64, byte, "a value"))
                }
                _ => {
                    self.scalar = true;
                    Ok(Step::Continue)
                }
            };
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
                if self.depth == 0 {
                    return Ok(Step::Done(at + 1));
                }
            }
            return Ok(Step::Continue);
        }

        if self.scalar {
            // Scalars end at the delimiter, which stays in the buffer
            return match byte {
                b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r' => {
                    self.pos = at;
                    Ok(Step::Done(at))
                }
                _ => Ok(Step::Continue),
            };
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return Ok(Step::Done(at + 1));
                }
            }
            _ => {}
        }
        Ok(Step::Continue)
    }
}

/// Incremental cursor over the byte chunks of one response document
pub struct Scanner<S> {
    source: S,
    buf: BytesMut,
    /// Absolute document offset of `buf[0]`
    offset: u64,
    eof: bool,
    max_value_bytes: usize,
}

impl<S: ResponseSource> Scanner<S> {
    pub fn new(source: S, max_value_bytes: usize) -> Self {
        Self {
            source,
            buf: BytesMut::new(),
            offset: 0,
            eof: false,
            max_value_bytes,
        }
    }

    /// Absolute offset of the next unconsumed byte
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes read from the source but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Pull the next chunk. Returns false once the source is exhausted.
    async fn fill(&mut self) -> Result<bool> {
        while !self.eof {
            match self.source.next_chunk().await? {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => {
                    self.buf.extend_from_slice(&chunk);
                    return Ok(true);
                }
                None => self.eof = true,
            }
        }
        Ok(false)
    }

    fn advance(&mut self, n: usize) {
        self.buf.advance(n);
        self.offset += n as u64;
    }

    fn skip_whitespace(&mut self) {
        let n = self
            .buf
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
            .count();
        self.advance(n);
    }

    async fn peek_non_ws_opt(&mut self) -> Result<Option<u8>> {
        loop {
            self.skip_whitespace();
            if let Some(&b) = self.buf.first() {
                return Ok(Some(b));
            }
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    async fn peek_non_ws(&mut self, expecting: &str) -> Result<u8> {
        match self.peek_non_ws_opt().await? {
            Some(b) => Ok(b),
            None => Err(common::unexpected_eof(self.offset, expecting)),
        }
    }

    async fn expect_byte(&mut self, byte: u8, expecting: &str) -> Result<()> {
        let found = self.peek_non_ws(expecting).await?;
        if found != byte {
            return Err(common::unexpected_byte(self.offset, found, expecting));
        }
        self.advance(1);
        Ok(())
    }

    /// Consume the opening brace of the root object
    pub async fn begin_object(&mut self) -> Result<()> {
        let found = self.peek_non_ws("a JSON object").await?;
        if found != b'{' {
            return Err(ResultError::parse(
                ErrorCode::PARSE_NOT_AN_OBJECT,
                format!(
                    "response must start with '{{', found '{}'",
                    found.escape_ascii()
                ),
                self.offset,
            ));
        }
        self.advance(1);
        Ok(())
    }

    /// Next key of the root object, with its colon consumed.
    /// Returns `None` once the closing brace has been consumed.
    pub async fn next_key(&mut self, first: bool) -> Result<Option<String>> {
        let mut found = self.peek_non_ws("a key or '}'").await?;
        if found == b'}' {
            self.advance(1);
            return Ok(None);
        }
        if !first {
            if found != b',' {
                return Err(common::unexpected_byte(self.offset, found, "',' or '}'"));
            }
            self.advance(1);
            found = self.peek_non_ws("a key").await?;
        }
        if found != b'"' {
            return Err(common::unexpected_byte(self.offset, found, "a key"));
        }

        let start = self.offset;
        let raw = self.capture_value().await?;
        let key: String = serde_json::from_slice(&raw).map_err(|e| {
            ResultError::parse(ErrorCode::PARSE_INVALID_VALUE, e.to_string(), start)
        })?;
        self.expect_byte(b':', "':'").await?;
        Ok(Some(key))
    }

    /// Run the value state machine, either keeping the bytes or discarding
    /// them as they are scanned
    async fn scan_value(&mut self, keep: bool) -> Result<Option<Bytes>> {
        self.peek_non_ws("a value").await?;
        let mut scan = ValueScan::default();

        loop {
            while scan.pos < self.buf.len() {
                let byte = self.buf[scan.pos];
                if let Step::Done(end) = scan.step(byte, self.offset)? {
                    if keep && end > self.max_value_bytes {
                        return Err(self.too_large());
                    }
                    if keep {
                        let bytes = self.buf.split_to(end).freeze();
                        self.offset += end as u64;
                        return Ok(Some(bytes));
                    }
                    self.advance(end);
                    return Ok(None);
                }
            }

            if keep {
                if scan.pos > self.max_value_bytes {
                    return Err(self.too_large());
                }
            } else {
                let scanned = scan.pos;
                self.advance(scanned);
                scan.pos = 0;
            }

            if !self.fill().await? {
                if scan.scalar {
                    let end = scan.pos;
                    if keep {
                        let bytes = self.buf.split_to(end).freeze();
                        self.offset += end as u64;
                        return Ok(Some(bytes));
                    }
                    self.advance(end);
                    return Ok(None);
                }
                return Err(common::unexpected_eof(
                    self.offset + scan.pos as u64,
                    "the end of a value",
                ));
            }
        }
    }

    fn too_large(&self) -> ResultError {
        ResultError::parse(
            ErrorCode::PARSE_VALUE_TOO_LARGE,
            format!("value exceeds {} bytes", self.max_value_bytes),
            self.offset,
        )
    }

    async fn capture_value(&mut self) -> Result<Bytes> {
        match self.scan_value(true).await? {
            Some(bytes) => Ok(bytes),
            None => Err(ResultError::parse(
                ErrorCode::PARSE_GENERIC,
                "value was not captured",
                self.offset,
            )),
        }
    }

    /// Capture and decode one complete value
    pub async fn read_value(&mut self) -> Result<Value> {
        self.peek_non_ws("a value").await?;
        let start = self.offset;
        let raw = self.capture_value().await?;
        serde_json::from_slice(&raw)
            .map_err(|e| ResultError::parse(ErrorCode::PARSE_INVALID_VALUE, e.to_string(), start))
    }

    /// Skip one complete value without buffering it
    pub async fn skip_value(&mut self) -> Result<()> {
        self.scan_value(false).await?;
        Ok(())
    }

    /// Open an array-valued section. A `null` section counts as empty and
    /// returns false.
    pub async fn begin_array(&mut self, section: &str) -> Result<bool> {
        let found = self.peek_non_ws("an array").await?;
        match found {
            b'[' => {
                self.advance(1);
                Ok(true)
            }
            b'n' => {
                let start = self.offset;
                match self.read_value().await? {
                    Value::Null => Ok(false),
                    _ => Err(unexpected_section_type(section, start)),
                }
            }
            _ => Err(unexpected_section_type(section, self.offset)),
        }
    }

    /// Position on the next array element. Returns false once the closing
    /// bracket has been consumed.
    pub async fn next_element(&mut self, first: bool) -> Result<bool> {
        let found = self.peek_non_ws("an element or ']'").await?;
        if found == b']' {
            self.advance(1);
            return Ok(false);
        }
        if !first {
            if found != b',' {
                return Err(common::unexpected_byte(self.offset, found, "',' or ']'"));
            }
            self.advance(1);
        }
        Ok(true)
    }

    /// Check that nothing but whitespace follows the root object
    pub async fn finish(&mut self) -> Result<()> {
        match self.peek_non_ws_opt().await? {
            None => Ok(()),
            Some(found) => Err(ResultError::parse(
                ErrorCode::PARSE_TRAILING_DATA,
                format!(
                    "unexpected '{}' after the response document",
                    found.escape_ascii()
                ),
                self.offset,
            )),
        }
    }
}

fn unexpected_section_type(section: &str, offset: u64) -> ResultError {
    ResultError::parse(
        ErrorCode::PARSE_UNEXPECTED_SECTION_TYPE,
        format!("'{}' must be an array", section),
        offset,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSource;
    use serde_json::json;

    fn scanner(doc: &str, chunk_size: usize) -> Scanner<ScriptedSource> {
        Scanner::new(ScriptedSource::from_document(doc, chunk_size), 1024)
    }

    #[tokio::test]
    async fn test_keys_and_values_across_chunk_boundaries() {
        let doc = r#" { "a" : {"x": [1, "}]"]}, "b":-12.5e3 ,"c":"q\"uote"} "#;
        for chunk_size in [1, 2, 3, 7, 64] {
            let mut s = scanner(doc, chunk_size);
            s.begin_object().await.unwrap();

            assert_eq!(s.next_key(true).await.unwrap().as_deref(), Some("a"));
            assert_eq!(s.read_value().await.unwrap(), json!({"x": [1, "}]"]}));
            assert_eq!(s.next_key(false).await.unwrap().as_deref(), Some("b"));
            assert_eq!(s.read_value().await.unwrap(), json!(-12500.0));
            assert_eq!(s.next_key(false).await.unwrap().as_deref(), Some("c"));
            assert_eq!(s.read_value().await.unwrap(), json!("q\"uote"));
            assert_eq!(s.next_key(false).await.unwrap(), None);
            s.finish().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_skip_value_does_not_retain_bytes() {
        let big = "x".repeat(4096);
        let doc = format!(r#"{{"plans":{{"text":"{}"}},"b":true}}"#, big);
        let mut s = Scanner::new(ScriptedSource::from_document(doc, 16), 64);

        s.begin_object().await.unwrap();
        assert_eq!(s.next_key(true).await.unwrap().as_deref(), Some("plans"));
        s.skip_value().await.unwrap();
        assert!(s.buffered() <= 16);
        assert_eq!(s.next_key(false).await.unwrap().as_deref(), Some("b"));
        assert_eq!(s.read_value().await.unwrap(), json!(true));
    }

    #[tokio::test]
    async fn test_value_over_limit_is_rejected() {
        let doc = format!(r#"{{"a":"{}"}}"#, "y".repeat(200));
        let mut s = Scanner::new(ScriptedSource::from_document(doc, 8), 32);

        s.begin_object().await.unwrap();
        s.next_key(true).await.unwrap();
        let err = s.read_value().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_VALUE_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_array_elements() {
        let mut s = scanner(r#"[ {"id":1} , 2,"three" ]"#, 3);

        assert!(s.begin_array("results").await.unwrap());
        let mut values = Vec::new();
        let mut first = true;
        while s.next_element(first).await.unwrap() {
            first = false;
            values.push(s.read_value().await.unwrap());
        }
        assert_eq!(values, vec![json!({"id": 1}), json!(2), json!("three")]);
    }

    #[tokio::test]
    async fn test_null_section_is_empty_and_scalar_section_is_rejected() {
        let mut s = scanner("null", 2);
        assert!(!s.begin_array("errors").await.unwrap());

        let mut s = scanner("42", 2);
        let err = s.begin_array("results").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_UNEXPECTED_SECTION_TYPE);
    }

    #[tokio::test]
    async fn test_structural_errors_carry_offsets() {
        let mut s = scanner("[1,2]", 4);
        let err = s.begin_object().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_NOT_AN_OBJECT);

        let mut s = scanner(r#"{"a":1 "b":2}"#, 4);
        s.begin_object().await.unwrap();
        s.next_key(true).await.unwrap();
        s.read_value().await.unwrap();
        let err = s.next_key(false).await.unwrap_err();
        assert_eq!(err, common::unexpected_byte(7, b'"', "',' or '}'"));

        let mut s = scanner(r#"{"a":[1,2"#, 4);
        s.begin_object().await.unwrap();
        s.next_key(true).await.unwrap();
        let err = s.read_value().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_UNEXPECTED_EOF);
    }

    #[tokio::test]
    async fn test_trailing_data_is_rejected() {
        let mut s = scanner("{} {}", 2);
        s.begin_object().await.unwrap();
        assert_eq!(s.next_key(true).await.unwrap(), None);
        let err = s.finish().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_TRAILING_DATA);
        assert!(matches!(err, ResultError::Parse { offset: 3, .. }));
    }
}
