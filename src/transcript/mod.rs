// transcript/mod.rs - Annotated transcript parsing and lookup

mod parser;
mod search;
mod types;

pub use parser::parse;
pub use search::{format_timestamp, search};
pub use types::{SegmentPayload, TranscriptSegment};
