//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod telegram;

pub use channel::{Channel, DocumentPayload, IncomingMessage, MessageStream, NoticeHandle};
pub use cli::CliChannel;
pub use telegram::{TelegramChannel, UpdateMode};
