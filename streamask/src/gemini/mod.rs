//! Gemini streaming wire format.

mod chunk;
mod request;

pub use chunk::{FinishReason, ParsedBatch, RecordDecoder, Terminal};
#[cfg(test)]
pub use chunk::{parse_records, ApiError};
pub use request::{stream_url, GenerateRequest, GenerationConfig};
