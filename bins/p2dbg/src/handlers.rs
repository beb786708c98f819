//! Minimal built-in `WindowHandler`s so the engine is useful without an
//! external GUI shell attached: a central log that prints every classified
//! message, and a main-terminal handler that prints raw terminal bytes.

use p2dbg_core::{HandlerError, MessageKind, WindowHandler};
use tracing::info;

pub struct CentralLogHandler;

impl WindowHandler for CentralLogHandler {
    fn handle(&mut self, kind: &MessageKind, payload: &[u8], arrival_ns: u64) -> Result<(), HandlerError> {
        let text = String::from_utf8_lossy(payload);
        info!(kind = %kind, arrival_ns, "{}", text.trim_end());
        Ok(())
    }

    fn on_rotate(&mut self) {
        info!("central log rotated");
    }
}

pub struct TerminalHandler;

impl WindowHandler for TerminalHandler {
    fn handle(&mut self, _kind: &MessageKind, payload: &[u8], _arrival_ns: u64) -> Result<(), HandlerError> {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(payload);
        let _ = stdout.flush();
        Ok(())
    }
}
