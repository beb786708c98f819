use std::fmt;

/// A window identity: lower-cased so registration and routing are
/// case-insensitive, matching the backtick command grammar's name matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The well-known `cog-{n}` destination for cog-tagged messages.
    pub fn cog(n: u8) -> Self {
        Self(format!("cog-{n}"))
    }

    /// The well-known `debugger-{n}` destination for debugger packets.
    pub fn debugger(n: u8) -> Self {
        Self(format!("debugger-{n}"))
    }

    /// The central log destination every classified message is copied to.
    pub fn central_log() -> Self {
        Self("central-log".into())
    }

    /// The main terminal destination `TERMINAL_OUTPUT` is copied to.
    pub fn main_terminal() -> Self {
        Self("main-terminal".into())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for WindowId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
