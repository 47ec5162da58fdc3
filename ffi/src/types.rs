//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Conversions live here to keep `lib.rs`
//! focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use snow_core::{ConnectorError, HttpMethod, RequestResult};

/// Opaque handle to a `Connector`. C callers receive a pointer to this and
/// pass it back into every FFI function.
pub struct FfiConnector {
    pub(crate) inner: snow_core::Connector,
}

/// Completion callback for `snow_fetch` / `snow_create`.
///
/// Invoked exactly once. Exactly one of `data` and `error_message` is
/// non-null; both point to memory owned by the library and valid only for
/// the duration of the call.
pub type FfiCallback = extern "C" fn(
    data: *const FfiTableResponse,
    error_message: *const c_char,
    user_data: *mut c_void,
);

/// Copy a Rust string into a heap C string, dropping interior NUL bytes.
pub(crate) fn c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `snow_build_*`. The host executes it and hands the outcome to
/// `snow_classify`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: snow_core::HttpRequest) -> *mut Self {
        let url = c_string(req.url);
        let body = req.body.map_or(std::ptr::null_mut(), c_string);

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response the host received, passed to `snow_classify`. The FFI
/// layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Hibernating = 1,
    Transport = 2,
    NullArg = 3,
    Panic = 4,
}

impl From<&ConnectorError> for FfiErrorCode {
    fn from(err: &ConnectorError) -> Self {
        match err {
            ConnectorError::Hibernating => FfiErrorCode::Hibernating,
            ConnectorError::Transport(_) => FfiErrorCode::Transport,
        }
    }
}

/// Success payload: the raw status and body the server returned.
#[repr(C)]
pub struct FfiTableResponse {
    pub status: u16,
    pub body: *mut c_char,
}

/// Result envelope returned by `snow_classify`.
///
/// On success `error_code` is `Ok`, `error_message` is null and `data`
/// points to the response. On failure `error_message` holds the fixed
/// message and `data` is null.
#[repr(C)]
pub struct FfiRequestResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub data: *mut FfiTableResponse,
}

impl FfiRequestResult {
    pub(crate) fn from_core(result: RequestResult) -> *mut Self {
        let result = match result {
            Ok(data) => FfiRequestResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                data: Box::into_raw(Box::new(FfiTableResponse {
                    status: data.response.status,
                    body: c_string(data.response.body),
                })),
            },
            Err(err) => Self::error((&err).into(), err.to_string()),
        };
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Box::into_raw(Box::new(Self::error(
            FfiErrorCode::NullArg,
            format!("null argument: {name}"),
        )))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Box::into_raw(Box::new(Self::error(FfiErrorCode::Panic, msg.to_string())))
    }

    fn error(error_code: FfiErrorCode, msg: String) -> Self {
        FfiRequestResult {
            error_code,
            error_message: c_string(msg),
            data: std::ptr::null_mut(),
        }
    }
}
