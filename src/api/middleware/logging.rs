//! Request correlation and logging middleware
//!
//! Every request gets a correlation id, either reused from the client's
//! x-request-id header or freshly generated. The id is stored in the request
//! extensions for handlers, echoed on the response, and attached to the
//! completion log line.

use crate::inference::RequestId;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Header carrying the correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse a client-supplied correlation id when it parses as a UUID
fn incoming_request_id(req: &ServiceRequest) -> RequestId {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId)
        .unwrap_or_default()
}

/// Request logging middleware
///
/// Correlation ids are assigned even when request logging is turned off.
pub struct RequestLogging {
    log_requests: bool,
}

impl RequestLogging {
    pub fn new(log_requests: bool) -> Self {
        Self { log_requests }
    }
}

impl Default for RequestLogging {
    fn default() -> Self {
        Self { log_requests: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware {
            service: Rc::new(service),
            log_requests: self.log_requests,
        }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: Rc<S>,
    log_requests: bool,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let log_requests = self.log_requests;
        let start_time = Instant::now();

        let request_id = incoming_request_id(&req);
        req.extensions_mut().insert(request_id.clone());

        // Extract request information
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query = req.query_string().to_string();
        let remote_addr = req
            .connection_info()
            .peer_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            let response = service.call(req).await;
            let duration_ms = start_time.elapsed().as_millis();

            match response {
                Ok(mut service_response) => {
                    let status = service_response.status();

                    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                        service_response
                            .headers_mut()
                            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }

                    if log_requests {
                        if status.is_success() {
                            info!(
                                request_id = %request_id,
                                method = %method,
                                path = %path,
                                query = %query,
                                status = %status,
                                duration_ms = %duration_ms,
                                remote_addr = %remote_addr,
                                "HTTP request completed"
                            );
                        } else if status.is_client_error() {
                            warn!(
                                request_id = %request_id,
                                method = %method,
                                path = %path,
                                query = %query,
                                status = %status,
                                duration_ms = %duration_ms,
                                remote_addr = %remote_addr,
                                "HTTP request rejected"
                            );
                        } else {
                            warn!(
                                request_id = %request_id,
                                method = %method,
                                path = %path,
                                query = %query,
                                status = %status,
                                duration_ms = %duration_ms,
                                remote_addr = %remote_addr,
                                "HTTP request failed"
                            );
                        }
                    }

                    Ok(service_response)
                }
                Err(error) => {
                    if log_requests {
                        warn!(
                            request_id = %request_id,
                            method = %method,
                            path = %path,
                            query = %query,
                            duration_ms = %duration_ms,
                            remote_addr = %remote_addr,
                            error = %error,
                            "HTTP request failed with error"
                        );
                    }
                    Err(error)
                }
            }
        })
    }
}
