//! The argument bundle handed to request transformations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::TransformationError;
use crate::http::request::QueryParams;

/// Mutable view of what the downstream handler will receive.
///
/// Transformations edit the bundle in place; the wrapping layer writes it
/// back into the request before the handler runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerArgs {
    body: Option<Value>,
    query: QueryParams,
}

impl HandlerArgs {
    pub fn new(body: Option<Value>, query: QueryParams) -> Self {
        Self { body, query }
    }

    pub fn with_body(body: Value) -> Self {
        Self::new(Some(body), QueryParams::new())
    }

    /// JSON body, if the request carried one.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Value> {
        self.body.as_mut()
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryParams {
        &mut self.query
    }

    /// Deserialize the body into the handler's payload type.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, TransformationError> {
        let body = self.body.as_ref().ok_or_else(|| {
            TransformationError::InvalidBody("request has no JSON body".to_string())
        })?;
        Ok(T::deserialize(body)?)
    }

    /// Edit the body as a typed payload and store the result back.
    pub fn update_body<T, F, R>(&mut self, f: F) -> Result<R, TransformationError>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T) -> R,
    {
        let mut payload: T = self.body_as()?;
        let out = f(&mut payload);
        self.body = Some(serde_json::to_value(&payload)?);
        Ok(out)
    }

    pub fn into_parts(self) -> (Option<Value>, QueryParams) {
        (self.body, self.query)
    }
}
