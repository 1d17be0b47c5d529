//! HTTP status codes as seen by response envelopes.

use std::fmt;

/// The status codes the MDM protocol distinguishes, plus a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    PreconditionFailed,
    InternalError,
    Other(u16),
}

impl StatusCode {
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            404 => StatusCode::NotFound,
            409 => StatusCode::Conflict,
            412 => StatusCode::PreconditionFailed,
            500 => StatusCode::InternalError,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::NotFound => 404,
            StatusCode::Conflict => 409,
            StatusCode::PreconditionFailed => 412,
            StatusCode::InternalError => 500,
            StatusCode::Other(code) => *code,
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode::from_u16(code)
    }
}

/// Names the status the way fault messages synthesized from it read.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Ok => write!(f, "OK"),
            StatusCode::Created => write!(f, "Created"),
            StatusCode::NoContent => write!(f, "NoContent"),
            StatusCode::BadRequest => write!(f, "BadRequest"),
            StatusCode::Unauthorized => write!(f, "Unauthorized"),
            StatusCode::NotFound => write!(f, "NotFound"),
            StatusCode::Conflict => write!(f, "Conflict"),
            StatusCode::PreconditionFailed => write!(f, "PreconditionFailed"),
            StatusCode::InternalError => write!(f, "InternalServerError"),
            StatusCode::Other(code) => write!(f, "{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_both_ways() {
        for code in [200, 201, 204, 400, 401, 404, 409, 412, 500] {
            assert_eq!(StatusCode::from_u16(code).as_u16(), code);
        }
        assert_eq!(StatusCode::from_u16(404), StatusCode::NotFound);
    }

    #[test]
    fn unknown_codes_are_kept_verbatim() {
        let status = StatusCode::from(418);
        assert_eq!(status, StatusCode::Other(418));
        assert_eq!(status.as_u16(), 418);
        assert_eq!(status.to_string(), "418");
    }

    #[test]
    fn display_names_the_status() {
        assert_eq!(StatusCode::NotFound.to_string(), "NotFound");
        assert_eq!(StatusCode::InternalError.to_string(), "InternalServerError");
    }
}
