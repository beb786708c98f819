use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port {port} is unavailable")]
    PortUnavailable { port: String },

    #[error("permission denied opening {port}")]
    PermissionDenied { port: String },

    #[error("baud rate {baud} is not supported")]
    BaudUnsupported { baud: u32 },

    #[error("write to serial port failed")]
    WriteFailed(#[source] std::io::Error),

    #[error("transport is not open")]
    NotOpen,

    #[error("ring buffer overflow, {dropped} bytes dropped")]
    BufferOverflow { dropped: usize },
}
