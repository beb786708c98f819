use crate::window_id::WindowId;
use std::fmt;

/// A validated cog index in `0..=7`. Constructed only through `CogIndex::new`,
/// so every `MessageKind` that carries one is guaranteed in range — an
/// out-of-range digit never reaches this type, it becomes `InvalidCog`
/// upstream in the extractor instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CogIndex(u8);

impl CogIndex {
    pub fn new(n: u8) -> Option<Self> {
        (n <= 7).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The window type keyword that opens a backtick CREATE command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowType {
    Term,
    Logic,
    Scope,
    ScopeXy,
    Plot,
    Bitmap,
    Midi,
    Fft,
    Spectro,
}

impl WindowType {
    /// Case-insensitive lookup of the first backtick token against the
    /// closed set of window-type keywords. `None` means the line is an
    /// UPDATE, not a CREATE.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token.to_ascii_lowercase().as_str() {
            "term" => Self::Term,
            "logic" => Self::Logic,
            "scope" => Self::Scope,
            "scope_xy" => Self::ScopeXy,
            "plot" => Self::Plot,
            "bitmap" => Self::Bitmap,
            "midi" => Self::Midi,
            "fft" => Self::Fft,
            "spectro" => Self::Spectro,
            _ => return None,
        })
    }
}

/// Confidence the extractor attaches to a classified span: `Matched` when a
/// rule's grammar was satisfied exactly, `Heuristic` when the span was
/// emitted by a fallback or recovery path (terminal-output fallback, line
/// budget overrun, sync loss).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Matched,
    Heuristic,
}

/// The closed enumeration of message kinds the extractor can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    TerminalOutput,
    CogMessage(CogIndex),
    P2SystemInit,
    DebuggerPacket(CogIndex),
    BacktickCreate { window_type: WindowType, name: WindowId },
    /// An UPDATE command may name more than one target window
    /// (`` `ch1 ch2 0,1,2 ``); the same payload is dispatched to each, in
    /// the order they appear in the name prefix.
    BacktickUpdate { names: Vec<WindowId> },
    InvalidCog,
    UnclassifiedText,
    InternalTxEcho,
}

impl MessageKind {
    /// A short machine-readable tag, used in log lines and metrics keys
    /// rather than the full `Debug` rendering (which includes payload-shaped
    /// fields for the backtick variants).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TerminalOutput => "terminal_output",
            Self::CogMessage(_) => "cog_message",
            Self::P2SystemInit => "p2_system_init",
            Self::DebuggerPacket(_) => "debugger_packet",
            Self::BacktickCreate { .. } => "backtick_create",
            Self::BacktickUpdate { .. } => "backtick_update",
            Self::InvalidCog => "invalid_cog",
            Self::UnclassifiedText => "unclassified_text",
            Self::InternalTxEcho => "internal_tx_echo",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CogMessage(n) => write!(f, "COG_MESSAGE({n})"),
            Self::DebuggerPacket(n) => write!(f, "DEBUGGER_PACKET({n})"),
            Self::BacktickCreate { window_type, name } => {
                write!(f, "BACKTICK_CREATE({window_type:?}, {name})")
            }
            Self::BacktickUpdate { names } => {
                write!(f, "BACKTICK_UPDATE(")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}")?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}", other.tag().to_uppercase()),
        }
    }
}
