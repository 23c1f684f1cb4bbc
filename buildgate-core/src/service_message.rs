//! TeamCity service messages
//!
//! Lines of the form `##teamcity[name key='value' ...]` written to stdout are
//! picked up by the build agent running us. Values must be escaped with `|`.

use std::fmt;

/// Severity of a `message` service message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Normal,
    Warning,
    Failure,
    Error,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Normal => write!(f, "NORMAL"),
            MessageStatus::Warning => write!(f, "WARNING"),
            MessageStatus::Failure => write!(f, "FAILURE"),
            MessageStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// A single service message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMessage {
    /// Build log message, optionally with error details
    Message {
        text: String,
        error_details: String,
        status: MessageStatus,
    },
    /// Set a build parameter visible to later steps
    SetParameter { name: String, value: String },
}

impl ServiceMessage {
    pub fn error(text: impl Into<String>, error_details: impl Into<String>) -> Self {
        ServiceMessage::Message {
            text: text.into(),
            error_details: error_details.into(),
            status: MessageStatus::Error,
        }
    }

    pub fn set_parameter(name: impl Into<String>, value: impl Into<String>) -> Self {
        ServiceMessage::SetParameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ServiceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMessage::Message {
                text,
                error_details,
                status,
            } => write!(
                f,
                "##teamcity[message text='{}' errorDetails='{}' status='{}']",
                escape(text),
                escape(error_details),
                status
            ),
            ServiceMessage::SetParameter { name, value } => write!(
                f,
                "##teamcity[setParameter name='{}' value='{}']",
                escape(name),
                escape(value)
            ),
        }
    }
}

/// Escape a value for use inside a service message attribute
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => out.push_str("||"),
            '\'' => out.push_str("|'"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_parameter() {
        let msg = ServiceMessage::set_parameter("env.build_required", "true");
        assert_eq!(
            msg.to_string(),
            "##teamcity[setParameter name='env.build_required' value='true']"
        );
    }

    #[test]
    fn test_error_message() {
        let msg = ServiceMessage::error("Build failed !!!", "http://tc/viewLog.html?buildId=7");
        assert_eq!(
            msg.to_string(),
            "##teamcity[message text='Build failed !!!' errorDetails='http://tc/viewLog.html?buildId=7' status='ERROR']"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("it's [x]|y\nz"), "it|'s |[x|]||y|nz");
        assert_eq!(escape("plain"), "plain");
    }
}
