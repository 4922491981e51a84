//! Manager wire codec
//!
//! The manager protocol exchanges blocks of `Key: Value` lines terminated
//! by an empty line:
//! ```text
//! Action: OutCampaignCreate\r\n
//! Name: TestCamp\r\n
//! \r\n
//! ```

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

use super::message::{Message, ACTION};

/// Line terminator used on the wire
pub const LINE_END: &str = "\r\n";

/// Upper bound on a single inbound block
pub const MAX_BLOCK_SIZE: usize = 1024 * 1024;

fn check_token(what: &str, text: &str) -> Result<()> {
    if text.contains(|c| c == '\r' || c == '\n') {
        return Err(Error::encode(format!(
            "{} {:?} contains a line break",
            what, text
        )));
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    check_token("field name", key)?;
    if key.trim().is_empty() {
        return Err(Error::encode("empty field name"));
    }
    if key.contains(':') {
        return Err(Error::encode(format!("field name {:?} contains ':'", key)));
    }
    Ok(())
}

/// Serialize an action into a wire block
///
/// Fields are written in the order given. Values are not escaped; anything
/// that would end a line (and with it the block) is rejected.
pub fn encode(action: &str, fields: &Message) -> Result<String> {
    check_token("action name", action)?;
    if action.trim().is_empty() {
        return Err(Error::encode("empty action name"));
    }

    let mut block = format!("{}: {}{}", ACTION, action, LINE_END);
    for (key, value) in fields.iter() {
        check_key(key)?;
        check_token("value", value)?;
        block.push_str(key);
        block.push_str(": ");
        block.push_str(value);
        block.push_str(LINE_END);
    }
    block.push_str(LINE_END);
    Ok(block)
}

/// Parse a raw block into a message
///
/// Each line is split on its first `:` and both halves are trimmed. A block
/// with no fields decodes to an empty message.
pub fn decode(raw: &str) -> Result<Message> {
    let mut message = Message::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| Error::Decode {
            line: line.to_string(),
        })?;
        message.push(key.trim(), value.trim());
    }
    Ok(message)
}

/// Read one raw block from the stream
///
/// Leading empty lines are skipped. EOF before any content means the peer
/// closed the session; EOF inside a block is a transport failure.
pub async fn read_block<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut pending = Vec::new();
    read_block_into(reader, &mut pending).await
}

/// Read one raw block, accumulating its bytes in `pending`
///
/// `pending` holds everything read for the current block so far. If the
/// future is dropped mid-block the bytes stay there, and calling again with
/// the same buffer resumes the block where it stopped. It is cleared once a
/// block is returned.
pub async fn read_block_into<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    pending: &mut Vec<u8>,
) -> Result<String> {
    loop {
        let room = (MAX_BLOCK_SIZE + 1).saturating_sub(pending.len()) as u64;
        let bytes_read = (&mut *reader)
            .take(room)
            .read_until(b'\n', pending)
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Error::SessionClosed
                } else {
                    Error::Io(e)
                }
            })?;

        if pending.len() > MAX_BLOCK_SIZE {
            pending.clear();
            return Err(Error::Transport(format!(
                "block exceeds {} bytes",
                MAX_BLOCK_SIZE
            )));
        }

        if bytes_read == 0 {
            let had_content = pending.iter().any(|b| !b.is_ascii_whitespace());
            pending.clear();
            if had_content {
                return Err(Error::Transport(
                    "connection closed in the middle of a block".to_string(),
                ));
            }
            return Err(Error::SessionClosed);
        }

        if pending.last() != Some(&b'\n') {
            continue;
        }

        let body = &pending[..pending.len() - 1];
        let line_start = body
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        let line = &pending[line_start..];
        if line != b"\r\n" && line != b"\n" {
            continue;
        }

        if line_start == 0 {
            pending.clear();
            continue;
        }

        let block = String::from_utf8(pending[..line_start].to_vec());
        pending.clear();
        return block.map_err(|_| Error::Transport("block is not valid UTF-8".to_string()));
    }
}

/// Write an encoded block and flush it
pub async fn write_block<W: AsyncWrite + Unpin>(writer: &mut W, block: &str) -> Result<()> {
    writer.write_all(block.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    fn campaign_fields() -> Message {
        Message::from_pairs([
            ("Name", "TestCamp"),
            ("Detail", "TestDetail"),
            ("Plan", "5ad6c7d8-535c-4cd3-b3e5-83ab420dcb56"),
            ("Dlma", "e276d8be-a558-4546-948a-f99913a7fea2"),
            ("Queue", "1c8eeabb-1dbc-4b75-a688-dd5b79b5afc6"),
        ])
    }

    #[test]
    fn test_encode_layout() {
        let block = encode("OutCampaignDelete", &Message::new().with("Uuid", "abc")).unwrap();
        assert_eq!(block, "Action: OutCampaignDelete\r\nUuid: abc\r\n\r\n");
    }

    #[test]
    fn test_decode_restores_encoded_fields() {
        let fields = campaign_fields();
        let block = encode("OutCampaignCreate", &fields).unwrap();
        let decoded = decode(&block).unwrap();

        let mut expected = Message::new().with("Action", "OutCampaignCreate");
        for (k, v) in fields.iter() {
            expected.push(k, v);
        }
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let fields = campaign_fields();
        assert_eq!(
            encode("OutCampaignCreate", &fields).unwrap(),
            encode("OutCampaignCreate", &fields).unwrap()
        );
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        let err = encode("OutCampaignCreate", &Message::new().with("Name", "a\r\n\r\nb"))
            .unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));

        let err = encode("Out\nCampaign", &Message::new()).unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));
    }

    #[test]
    fn test_encode_rejects_delimiter_in_key() {
        let err = encode("Ping", &Message::new().with("Bad:Key", "x")).unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));
    }

    #[test]
    fn test_value_may_contain_delimiter() {
        let block = encode("Originate", &Message::new().with("Channel", "SIP/100:5060")).unwrap();
        let decoded = decode(&block).unwrap();
        assert_eq!(decoded.get("Channel"), Some("SIP/100:5060"));
    }

    #[test]
    fn test_decode_trims_and_accepts_bare_newlines() {
        let msg = decode("Response:   Success  \nMessage: ok\n").unwrap();
        assert_eq!(msg.response(), Some("Success"));
        assert_eq!(msg.get("Message"), Some("ok"));
    }

    #[test]
    fn test_decode_line_without_delimiter_fails() {
        let err = decode("Response: Success\r\ngarbage\r\n").unwrap_err();
        match err {
            Error::Decode { line } => assert_eq!(line, "garbage"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_empty_block() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("\r\n\r\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_block_skips_leading_blank_lines() {
        let data = b"\r\n\r\nEvent: FullyBooted\r\nStatus: ok\r\n\r\nResponse: Success\r\n\r\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        let first = read_block(&mut reader).await.unwrap();
        assert_eq!(first, "Event: FullyBooted\r\nStatus: ok\r\n");
        let second = read_block(&mut reader).await.unwrap();
        assert_eq!(second, "Response: Success\r\n");
        assert!(matches!(
            read_block(&mut reader).await,
            Err(Error::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_block_truncated() {
        let mut reader = BufReader::new(Cursor::new(b"Response: Success\r\n".to_vec()));
        assert!(matches!(
            read_block(&mut reader).await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_read_block_rejects_oversized_line() {
        let mut data = vec![b'x'; MAX_BLOCK_SIZE + 16];
        data.extend_from_slice(b"\r\n\r\n");
        let mut reader = BufReader::new(Cursor::new(data));
        let mut pending = Vec::new();

        let err = read_block_into(&mut reader, &mut pending).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_read_block_resumes_from_pending_bytes() {
        let mut pending = b"Response: Success\r\nEventList: st".to_vec();
        let mut reader = BufReader::new(Cursor::new(b"art\r\nMessage: tail\r\n\r\n".to_vec()));

        let block = read_block_into(&mut reader, &mut pending).await.unwrap();
        assert_eq!(
            block,
            "Response: Success\r\nEventList: start\r\nMessage: tail\r\n"
        );
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_write_block() {
        let mut output = Vec::new();
        write_block(&mut output, "Action: Ping\r\n\r\n").await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Action: Ping\r\n\r\n");
    }
}
