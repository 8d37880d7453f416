//! HTTP middleware.

pub mod authorize;

pub use authorize::{
    authorize_and_transform, require_authorization, AuthorizedPolicy, MAX_TRANSFORM_BODY_BYTES,
};
