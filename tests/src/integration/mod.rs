//! Engine and facade integration tests.


mod correlation;
mod dispatch;
mod facade;
mod framing;
mod lifecycle;
mod status;
