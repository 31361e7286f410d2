mod receipt;
pub use receipt::Receipt;
mod stream;
pub use stream::{Stream, StreamOpenError, StreamSender, StreamState};
