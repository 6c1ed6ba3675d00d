//! The in-band command protocol.
//!
//! Commands share the data-plane port: a reserved path prefix marks a
//! request as control traffic, and the suffix names one of a closed set of
//! commands. A request header lets the operator's own tooling pass through
//! the prefix untouched (so command calls made *through* the proxy are not
//! re-intercepted by the backend's own instance).

mod dispatch;

pub use dispatch::dispatch;

use hyper::HeaderMap;

/// Reserved path prefix for command traffic.
pub const COMMAND_PREFIX: &str = "/@@@proxy";

/// Header that suppresses command interpretation for one request.
pub const IGNORE_COMMANDS_HEADER: &str = "x-ignore-commands";

/// Query parameters that trigger clears alongside any primary command.
pub const CLEAR_REPORTS_PARAM: &str = "clear-reports";
pub const CLEAR_USAGE_PARAM: &str = "clear-usage";

pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The closed command set. Dispatch is an exhaustive match, not a handler
/// registry: the set never grows at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Reload,
    Stop,
    Usage,
    Reports,
    ClearReports,
    ClearUsage,
}

impl Command {
    /// Case-sensitive lookup of the path suffix after the prefix.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ping" => Some(Command::Ping),
            "reload" => Some(Command::Reload),
            "stop" => Some(Command::Stop),
            "usage" => Some(Command::Usage),
            "reports" => Some(Command::Reports),
            "reports/clear" => Some(Command::ClearReports),
            "usage/clear" => Some(Command::ClearUsage),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Reload => "reload",
            Command::Stop => "stop",
            Command::Usage => "usage",
            Command::Reports => "reports",
            Command::ClearReports => "reports/clear",
            Command::ClearUsage => "usage/clear",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Command::Usage | Command::Reports => CONTENT_TYPE_JSON,
            _ => CONTENT_TYPE_TEXT,
        }
    }
}

/// Is this path command-protocol traffic?
pub fn is_command_path(path: &str) -> bool {
    match path.strip_prefix(COMMAND_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The command suffix of a path, without the prefix and its slash.
pub fn command_name(path: &str) -> &str {
    path.strip_prefix(COMMAND_PREFIX)
        .map(|rest| rest.strip_prefix('/').unwrap_or(rest))
        .unwrap_or("")
}

/// True when the request opts out of command interpretation.
pub fn has_ignore_marker(headers: &HeaderMap) -> bool {
    headers
        .get(IGNORE_COMMANDS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Is `name=true` present in the query string?
pub fn query_flag(query: Option<&str>, name: &str) -> bool {
    let Some(query) = query else {
        return false;
    };
    query.split('&').any(|pair| match pair.split_once('=') {
        Some((key, value)) => {
            key == name
                && urlencoding::decode(value)
                    .map(|v| v == "true")
                    .unwrap_or(false)
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_covers_the_whole_set() {
        for command in [
            Command::Ping,
            Command::Reload,
            Command::Stop,
            Command::Usage,
            Command::Reports,
            Command::ClearReports,
            Command::ClearUsage,
        ] {
            assert_eq!(Command::parse(command.name()), Some(command));
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!(Command::parse("PING"), None);
        assert_eq!(Command::parse("Ping"), None);
        assert_eq!(Command::parse("bogus"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn content_types_split_text_from_structured() {
        assert_eq!(Command::Ping.content_type(), CONTENT_TYPE_TEXT);
        assert_eq!(Command::Stop.content_type(), CONTENT_TYPE_TEXT);
        assert_eq!(Command::Usage.content_type(), CONTENT_TYPE_JSON);
        assert_eq!(Command::Reports.content_type(), CONTENT_TYPE_JSON);
    }

    #[test]
    fn command_path_detection() {
        assert!(is_command_path("/@@@proxy/ping"));
        assert!(is_command_path("/@@@proxy"));
        assert!(!is_command_path("/@@@proxyish"));
        assert!(!is_command_path("/v1/data"));
    }

    #[test]
    fn command_name_extraction() {
        assert_eq!(command_name("/@@@proxy/ping"), "ping");
        assert_eq!(command_name("/@@@proxy/reports/clear"), "reports/clear");
        assert_eq!(command_name("/@@@proxy"), "");
    }

    #[test]
    fn ignore_marker_requires_true() {
        let mut headers = HeaderMap::new();
        assert!(!has_ignore_marker(&headers));
        headers.insert(IGNORE_COMMANDS_HEADER, "true".parse().unwrap());
        assert!(has_ignore_marker(&headers));
        headers.insert(IGNORE_COMMANDS_HEADER, "TRUE".parse().unwrap());
        assert!(has_ignore_marker(&headers));
        headers.insert(IGNORE_COMMANDS_HEADER, "1".parse().unwrap());
        assert!(!has_ignore_marker(&headers));
    }

    #[test]
    fn query_flags() {
        assert!(query_flag(Some("clear-usage=true"), "clear-usage"));
        assert!(query_flag(Some("a=1&clear-usage=true"), "clear-usage"));
        assert!(!query_flag(Some("clear-usage=false"), "clear-usage"));
        assert!(!query_flag(Some("clear-usage"), "clear-usage"));
        assert!(!query_flag(None, "clear-usage"));
    }
}
