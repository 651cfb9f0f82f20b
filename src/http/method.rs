//! HTTP request methods.

use std::fmt;
use std::str::FromStr;

use crate::http::error::Error;

/// The request methods a route can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET: fetch the target resource.
    GET,
    /// POST: hand the request body to the target resource for processing.
    POST,
    /// PUT: create or replace the target resource with the request body.
    PUT,
    /// DELETE: remove the target resource.
    DELETE,
    /// HEAD: like GET, without a response body.
    HEAD,
    /// OPTIONS: ask which methods and features the target supports.
    OPTIONS,
    /// PATCH: apply a partial update to the target resource.
    PATCH,
    /// TRACE: echo the request back, for diagnostics.
    TRACE,
    /// CONNECT: open a tunnel through a proxy; routable like any other method.
    CONNECT,
}

impl Method {
    /// Every method, in declaration order.
    pub const ALL: [Method; 9] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
        Method::PATCH,
        Method::TRACE,
        Method::CONNECT,
    ];
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            "PATCH" => Ok(Method::PATCH),
            "TRACE" => Ok(Method::TRACE),
            "CONNECT" => Ok(Method::CONNECT),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
