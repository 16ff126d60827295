//! HTTP status codes as a typed enum.
//!
//! Only the codes a controller application actually answers with.
//!
//! ```rust
//! use pergola::{Response, Status};
//!
//! Response::status(Status::NoContent);
//! Response::redirect("/widgets/42");   // 303 See Other
//! ```

/// The status codes pergola produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    NoContent,           // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,    // 301
    Found,               // 302
    SeeOther,            // 303

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    MethodNotAllowed,    // 405
    PayloadTooLarge,     // 413
    UnprocessableContent,// 422

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::Created              => 201,
            Self::NoContent            => 204,
            Self::MovedPermanently     => 301,
            Self::Found                => 302,
            Self::SeeOther             => 303,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::Forbidden            => 403,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::PayloadTooLarge      => 413,
            Self::UnprocessableContent => 422,
            Self::InternalServerError  => 500,
            Self::ServiceUnavailable   => 503,
        }
    }

    pub fn is_redirect(self) -> bool {
        (300..400).contains(&self.code())
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> http::StatusCode {
        // Every variant above is a registered code.
        http::StatusCode::from_u16(s.code()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
