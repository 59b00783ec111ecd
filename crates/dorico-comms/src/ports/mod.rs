//! Ports the engine is written against.

pub mod transport;

pub use transport::{Connector, FrameKind, FrameSink, FrameSource, ReceivedFrame, TransportPair};
