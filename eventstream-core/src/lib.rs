//! Core wire types for eventstream.
//!
//! This crate provides the I/O-free building blocks shared by the client:
//!
//! - RecordIO framing (`<length>\n<payload>`): the incremental
//!   [`RecordDecoder`] and [`encode_record`]
//! - the [`MessageCodec`] contract plus [`JsonCodec`], [`ProtoCodec`], and
//!   [`StringCodec`] implementations
//! - the [`FrameError`] and [`CodecError`] taxonomies

mod codec;
mod error;
mod recordio;

pub use codec::*;
pub use error::*;
pub use recordio::*;
