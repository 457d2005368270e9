//! Push metrics to a Prometheus remote_write endpoint.
//!
//! [`WriteClient`] gathers a [`MetricsSource`] on a fixed interval and hands the
//! snapshot to a [`RemoteSink`]. [`RemoteWriteSink`] is the HTTP implementation,
//! sending snappy compressed protobuf as described by remote_write 1.0.

#[macro_use]
extern crate tracing;

mod client;
mod convert;
mod error;
pub mod proto;
mod sink;

pub use client::{
    MetricsSource,
    WriteClient,
};
pub use convert::write_request;
pub use error::RemoteWriteError;
pub use sink::{
    RemoteSink,
    RemoteWriteSink,
    DEFAULT_JOB_NAME,
};
