//! # Portico Core
//!
//! Shared types for the Portico filter pipeline.
//!
//! This crate provides the exchange model every filter works against:
//!
//! - [`Request`] / [`Response`] - one in-flight HTTP exchange; a response is
//!   closed exactly once and rejects writes afterwards
//! - [`Dto`] / [`ServiceOutput`] - request and response DTOs keyed by runtime type
//! - [`HostError`] / [`ResponseStatus`] - errors and their serialisable payload
//! - [`Feature`] / [`RequestAttributes`] - capability and requester bitsets
//! - [`Container`] - services shared by all exchanges
//! - [`RequestId`] / [`Items`] - per-exchange identity and typed storage

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bitset;

mod attributes;
mod context;
mod di;
mod dto;
mod error;
mod feature;
mod request;
mod response;

pub use attributes::RequestAttributes;
pub use context::{Items, RequestId};
pub use di::Container;
pub use dto::{Dto, HttpResult, ServiceOutput};
pub use error::{ArgumentErrorKind, HostError, HostResult, ResponseError, ResponseStatus};
pub use feature::Feature;
pub use request::Request;
pub use response::Response;
