//! Request extractors that reject with [`ApiError`]

use crate::error::ApiError;
use axum::extract::FromRequest;

/// `axum::Json` whose rejections render in the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
