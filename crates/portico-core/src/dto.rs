//! Request/response DTOs and service results.

use crate::error::HostError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::any::{Any, TypeId};

/// A request or response DTO.
///
/// Implemented for every `'static + Send + Sync` type, `Box<dyn Dto>`
/// included. Type-scoped filters are keyed by the runtime type behind
/// `concrete()`, which sees through boxing.
pub trait Dto: Any + Send + Sync + 'static {
    /// The runtime type of the DTO.
    fn dto_type_id(&self) -> TypeId;

    /// The Rust type name, for logs.
    fn dto_type_name(&self) -> &'static str;

    /// Upcasts for downcasting in filters.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> Dto for T {
    fn dto_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn dto_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Dto {
    /// The innermost DTO when `self` is a (possibly nested) `Box<dyn Dto>`.
    #[must_use]
    pub fn concrete(&self) -> &dyn Dto {
        match self.as_any().downcast_ref::<Box<dyn Dto>>() {
            Some(inner) => inner.concrete(),
            None => self,
        }
    }

    /// Downcasts to a concrete DTO type.
    #[must_use]
    pub fn downcast_ref<T: Dto>(&self) -> Option<&T> {
        self.concrete().as_any().downcast_ref()
    }
}

/// A response carrying explicit HTTP decoration around an optional DTO.
#[derive(Debug)]
pub struct HttpResult {
    /// Status to send.
    pub status: StatusCode,
    /// Extra headers.
    pub headers: HeaderMap,
    /// The wrapped DTO, if any.
    pub dto: Option<Box<dyn Dto>>,
}

impl HttpResult {
    /// Wraps a DTO with a status.
    #[must_use]
    pub fn new(status: StatusCode, dto: impl Dto) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            dto: Some(Box::new(dto)),
        }
    }

    /// Wraps an already type-erased DTO with a status.
    #[must_use]
    pub fn from_boxed(status: StatusCode, dto: Box<dyn Dto>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            dto: Some(dto),
        }
    }

    /// A result with only a status.
    #[must_use]
    pub fn status_only(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            dto: None,
        }
    }
}

impl std::fmt::Debug for dyn Dto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dto({})", self.dto_type_name())
    }
}

/// What a service produced for one exchange.
#[derive(Debug)]
pub enum ServiceOutput {
    /// A bare response DTO.
    Dto(Box<dyn Dto>),
    /// A DTO decorated with status and headers.
    Http(HttpResult),
    /// The service failed.
    Error(HostError),
    /// Raw bytes written straight through.
    Stream(Bytes),
}

impl ServiceOutput {
    /// Wraps a response DTO.
    #[must_use]
    pub fn dto(dto: impl Dto) -> Self {
        Self::Dto(Box::new(dto))
    }

    /// Wraps an already type-erased response DTO.
    #[must_use]
    pub fn from_boxed(dto: Box<dyn Dto>) -> Self {
        Self::Dto(dto)
    }

    /// Extracts the response DTO that keys response-side filters.
    ///
    /// Errors and raw streams have none.
    #[must_use]
    pub fn response_dto(&self) -> Option<&dyn Dto> {
        let dto = match self {
            Self::Dto(dto) => &**dto,
            Self::Http(result) => result.dto.as_deref()?,
            Self::Error(_) | Self::Stream(_) => return None,
        };
        Some(dto.concrete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct GetUserResponse {
        id: u32,
    }

    #[test]
    fn test_dto_type_id_is_concrete() {
        let dto: &dyn Dto = &GetUserResponse { id: 1 };
        assert_eq!(dto.dto_type_id(), TypeId::of::<GetUserResponse>());
        assert!(dto.dto_type_name().ends_with("GetUserResponse"));
    }

    #[test]
    fn test_downcast() {
        let dto: &dyn Dto = &GetUserResponse { id: 3 };
        assert_eq!(dto.downcast_ref::<GetUserResponse>(), Some(&GetUserResponse { id: 3 }));
        assert!(dto.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_response_dto_extraction() {
        let output = ServiceOutput::dto(GetUserResponse { id: 1 });
        let dto = output.response_dto().expect("dto output");
        assert_eq!(dto.dto_type_id(), TypeId::of::<GetUserResponse>());

        let wrapped = ServiceOutput::Http(HttpResult::new(StatusCode::CREATED, GetUserResponse { id: 2 }));
        assert_eq!(
            wrapped.response_dto().map(Dto::dto_type_id),
            Some(TypeId::of::<GetUserResponse>())
        );

        assert!(ServiceOutput::Http(HttpResult::status_only(StatusCode::NO_CONTENT))
            .response_dto()
            .is_none());
        assert!(ServiceOutput::Error(HostError::not_found("x")).response_dto().is_none());
        assert!(ServiceOutput::Stream(Bytes::from_static(b"raw")).response_dto().is_none());
    }

    #[test]
    fn test_erased_dto_keeps_concrete_type() {
        let erased: Box<dyn Dto> = Box::new(GetUserResponse { id: 4 });
        assert_eq!(
            erased.concrete().dto_type_id(),
            TypeId::of::<GetUserResponse>()
        );

        let outputs = [
            ServiceOutput::dto(Box::new(GetUserResponse { id: 4 }) as Box<dyn Dto>),
            ServiceOutput::from_boxed(Box::new(GetUserResponse { id: 4 })),
            ServiceOutput::Http(HttpResult::new(
                StatusCode::OK,
                Box::new(GetUserResponse { id: 4 }) as Box<dyn Dto>,
            )),
            ServiceOutput::Http(HttpResult::from_boxed(
                StatusCode::OK,
                Box::new(GetUserResponse { id: 4 }),
            )),
        ];
        for output in &outputs {
            let dto = output.response_dto().expect("dto output");
            assert_eq!(dto.dto_type_id(), TypeId::of::<GetUserResponse>());
            assert_eq!(
                dto.downcast_ref::<GetUserResponse>(),
                Some(&GetUserResponse { id: 4 })
            );
        }
    }
}
