//! Common utilities shared by the library and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result, ScenarioFailure};

/// Parse a "listening at:" address from a server's startup output.
/// Handles IPv6 format [::]:PORT by converting to 127.0.0.1:PORT
pub fn parse_listen_address(line: &str) -> Option<String> {
    if let Some(addr_start) = line.find("listening at:") {
        let addr_part = &line[addr_start + "listening at:".len()..];
        let addr = addr_part.trim().to_string();
        let addr = if addr.starts_with("[::]:") {
            addr.replace("[::]:", "127.0.0.1:")
        } else {
            addr
        };
        Some(addr)
    } else {
        None
    }
}

/// Split `host:port`, the port being the text after the last ':'
pub fn split_host_port(addr: &str) -> Option<(String, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse().ok()?;
    Some((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen_address() {
        assert_eq!(
            parse_listen_address("mock manager listening at: 127.0.0.1:40123"),
            Some("127.0.0.1:40123".to_string())
        );
        assert_eq!(
            parse_listen_address("listening at: [::]:5038"),
            Some("127.0.0.1:5038".to_string())
        );
        assert_eq!(parse_listen_address("starting up"), None);
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("127.0.0.1:5038"),
            Some(("127.0.0.1".to_string(), 5038))
        );
        assert_eq!(split_host_port("localhost"), None);
    }
}
