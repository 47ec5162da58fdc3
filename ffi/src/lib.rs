//! C-ABI wrapper around `snow-core`.
//!
//! # Overview
//! Exposes the table connector to any language with a C FFI, in two styles:
//! - `snow_fetch` / `snow_create` run the request over the bundled blocking
//!   transport and report through `callback(data, error_message, user_data)`.
//! - `snow_build_*` / `snow_classify` let the host perform the HTTP
//!   round-trip itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Callbacks fire exactly once, with exactly one of `data` and
//!   `error_message` non-null, including for null arguments and panics.
//! - The C caller owns every returned pointer and must release it with the
//!   matching `snow_free_*` / `snow_connector_free` function.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use snow_core::{
    ConnectionOptions, Connector, HttpResponse, RequestResult, TransportError, TransportOutcome,
    UreqTransport,
};
use tracing::warn;

use types::*;

/// Read a C string argument, rejecting invalid UTF-8.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string.
unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

/// Read server-provided text, where invalid UTF-8 is replaced.
///
/// # Safety
/// Same as `read_str`.
unsafe fn read_lossy(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Connector lifecycle
// ---------------------------------------------------------------------------

/// Create a connector for one instance, account and table.
///
/// Returns null if any argument is null or not valid UTF-8, or if an
/// internal panic occurs. The
/// caller must free the returned pointer with `snow_connector_free`.
#[unsafe(no_mangle)]
pub extern "C" fn snow_connector_new(
    url: *const c_char,
    username: *const c_char,
    password: *const c_char,
    table: *const c_char,
) -> *mut FfiConnector {
    catch_unwind(|| {
        if url.is_null() || username.is_null() || password.is_null() || table.is_null() {
            return std::ptr::null_mut();
        }
        let fields = unsafe { (read_str(url), read_str(username), read_str(password), read_str(table)) };
        let (Some(url), Some(username), Some(password), Some(table)) = fields else {
            warn!("rejected connection options: invalid UTF-8");
            return std::ptr::null_mut();
        };
        let options = ConnectionOptions::new(url, username, password, table);
        Box::into_raw(Box::new(FfiConnector {
            inner: Connector::new(options),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a connector from a JSON object
/// `{"url", "username", "password", "serviceNowTable"}`.
///
/// Returns null if `json` is null, not valid UTF-8 or cannot be parsed.
#[unsafe(no_mangle)]
pub extern "C" fn snow_connector_from_json(json: *const c_char) -> *mut FfiConnector {
    catch_unwind(|| {
        if json.is_null() {
            return std::ptr::null_mut();
        }
        let Some(raw) = (unsafe { read_str(json) }) else {
            return std::ptr::null_mut();
        };
        match ConnectionOptions::from_json(&raw) {
            Ok(options) => Box::into_raw(Box::new(FfiConnector {
                inner: Connector::new(options),
            })),
            Err(e) => {
                warn!(error = %e, "rejected connection options");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a connector. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn snow_connector_free(connector: *mut FfiConnector) {
    if !connector.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(connector) });
        });
    }
}

// ---------------------------------------------------------------------------
// Callback operations
// ---------------------------------------------------------------------------

/// Hand a result to the callback. Memory passed in is released on return.
fn deliver(result: RequestResult, callback: FfiCallback, user_data: *mut c_void) -> FfiErrorCode {
    match result {
        Ok(data) => {
            let response = FfiTableResponse {
                status: data.response.status,
                body: c_string(data.response.body),
            };
            callback(&response, std::ptr::null(), user_data);
            drop(unsafe { CString::from_raw(response.body) });
            FfiErrorCode::Ok
        }
        Err(err) => deliver_error((&err).into(), err.to_string(), callback, user_data),
    }
}

fn deliver_error(
    code: FfiErrorCode,
    message: String,
    callback: FfiCallback,
    user_data: *mut c_void,
) -> FfiErrorCode {
    let message = c_string(message);
    callback(std::ptr::null(), message, user_data);
    drop(unsafe { CString::from_raw(message) });
    code
}

/// Run one call and report it through the callback exactly once.
fn run_with_callback(
    op: &str,
    connector: *const FfiConnector,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
    call: fn(&Connector, &UreqTransport) -> RequestResult,
) -> FfiErrorCode {
    let Some(callback) = callback else {
        return FfiErrorCode::NullArg;
    };
    if connector.is_null() {
        return deliver_error(
            FfiErrorCode::NullArg,
            "null argument: connector".to_string(),
            callback,
            user_data,
        );
    }
    let connector = unsafe { &*connector };
    match catch_unwind(AssertUnwindSafe(|| call(&connector.inner, &UreqTransport::new()))) {
        Ok(result) => deliver(result, callback, user_data),
        Err(_) => {
            warn!(op, "panic during table request");
            deliver_error(FfiErrorCode::Panic, format!("panic in {op}"), callback, user_data)
        }
    }
}

/// Retrieve a single record and report it through `callback`.
///
/// Returns the error code of the delivered outcome, or `NullArg` without
/// invoking anything if `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn snow_fetch(
    connector: *const FfiConnector,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) -> FfiErrorCode {
    run_with_callback("snow_fetch", connector, callback, user_data, |c, t| c.fetch(t))
}

/// POST to the table (no query, no body) and report through `callback`.
#[unsafe(no_mangle)]
pub extern "C" fn snow_create(
    connector: *const FfiConnector,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) -> FfiErrorCode {
    run_with_callback("snow_create", connector, callback, user_data, |c, t| c.create(t))
}

// ---------------------------------------------------------------------------
// Host-does-IO operations
// ---------------------------------------------------------------------------

/// Build the request `snow_fetch` would send. Returns null if `connector`
/// is null. Free with `snow_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn snow_build_fetch(connector: *const FfiConnector) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if connector.is_null() {
            return std::ptr::null_mut();
        }
        let connector = unsafe { &*connector };
        FfiHttpRequest::from_core(connector.inner.build_fetch())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request `snow_create` would send.
#[unsafe(no_mangle)]
pub extern "C" fn snow_build_create(connector: *const FfiConnector) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if connector.is_null() {
            return std::ptr::null_mut();
        }
        let connector = unsafe { &*connector };
        FfiHttpRequest::from_core(connector.inner.build_create())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Classify the outcome of a request the host executed.
///
/// `response` may be null when nothing was received; `transport_error` is
/// the host's error text, or null if the transport succeeded. Free the
/// result with `snow_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn snow_classify(
    connector: *const FfiConnector,
    response: *const FfiHttpResponse,
    transport_error: *const c_char,
) -> *mut FfiRequestResult {
    catch_unwind(|| {
        if connector.is_null() {
            return FfiRequestResult::null_arg("connector");
        }
        let connector = unsafe { &*connector };
        let error = if transport_error.is_null() {
            None
        } else {
            Some(TransportError::Failed(unsafe { read_lossy(transport_error) }))
        };
        let response = if response.is_null() {
            None
        } else {
            let resp = unsafe { &*response };
            let body = if resp.body.is_null() {
                String::new()
            } else {
                unsafe { read_lossy(resp.body) }
            };
            Some(HttpResponse {
                status: resp.status,
                headers: Vec::new(),
                body,
            })
        };
        FfiRequestResult::from_core(connector.inner.classify(TransportOutcome { error, response }))
    })
    .unwrap_or_else(|_| FfiRequestResult::panic("panic in snow_classify"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `snow_build_*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn snow_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiRequestResult` returned by `snow_classify`. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn snow_free_result(result: *mut FfiRequestResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if !result.data.is_null() {
            let data = unsafe { Box::from_raw(result.data) };
            free_c_string(data.body);
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn snow_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::Arc;

    use mock_server::Instance;

    /// What a callback observed, written through `user_data`.
    #[derive(Default)]
    struct Seen {
        calls: u32,
        status: Option<u16>,
        body: Option<String>,
        error: Option<String>,
    }

    extern "C" fn record(
        data: *const FfiTableResponse,
        error_message: *const c_char,
        user_data: *mut c_void,
    ) {
        let seen = unsafe { &mut *(user_data as *mut Seen) };
        seen.calls += 1;
        if !data.is_null() {
            let data = unsafe { &*data };
            seen.status = Some(data.status);
            seen.body = Some(unsafe { CStr::from_ptr(data.body) }.to_str().unwrap().to_string());
        }
        if !error_message.is_null() {
            seen.error = Some(
                unsafe { CStr::from_ptr(error_message) }
                    .to_str()
                    .unwrap()
                    .to_string(),
            );
        }
    }

    fn new_connector(url: &str) -> *mut FfiConnector {
        let url = CString::new(url).unwrap();
        let user = CString::new("admin").unwrap();
        let pass = CString::new("s3cret").unwrap();
        let table = CString::new("change_request").unwrap();
        snow_connector_new(url.as_ptr(), user.as_ptr(), pass.as_ptr(), table.as_ptr())
    }

    fn spawn_server(instance: Arc<Instance>) -> String {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run_with(listener, instance).await
            })
            .unwrap();
        });
        format!("http://{addr}")
    }

    fn c_str<'a>(ptr: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    #[test]
    fn connector_new_and_free() {
        let connector = new_connector("http://localhost:3000");
        assert!(!connector.is_null());
        snow_connector_free(connector);
    }

    #[test]
    fn connector_new_null_returns_null() {
        let url = CString::new("http://localhost:3000").unwrap();
        let connector =
            snow_connector_new(url.as_ptr(), std::ptr::null(), std::ptr::null(), std::ptr::null());
        assert!(connector.is_null());
    }

    #[test]
    fn connector_new_rejects_invalid_utf8_password() {
        let url = CString::new("http://localhost:3000").unwrap();
        let user = CString::new("admin").unwrap();
        let pass = CString::new(vec![b's', 0xff, b'x']).unwrap();
        let table = CString::new("change_request").unwrap();
        let connector =
            snow_connector_new(url.as_ptr(), user.as_ptr(), pass.as_ptr(), table.as_ptr());
        assert!(connector.is_null());
    }

    #[test]
    fn connector_from_json_rejects_invalid_utf8() {
        let json = CString::new(vec![b'{', 0xc3, b'}']).unwrap();
        assert!(snow_connector_from_json(json.as_ptr()).is_null());
    }

    #[test]
    fn connector_free_null_is_safe() {
        snow_connector_free(std::ptr::null_mut());
    }

    #[test]
    fn connector_from_json() {
        let json = CString::new(
            r#"{"url":"http://localhost:3000","username":"a","password":"b","serviceNowTable":"incident"}"#,
        )
        .unwrap();
        let connector = snow_connector_from_json(json.as_ptr());
        assert!(!connector.is_null());

        let req = snow_build_create(connector);
        assert_eq!(
            c_str(unsafe { &*req }.url),
            "http://localhost:3000/api/now/table/incident"
        );

        snow_free_request(req);
        snow_connector_free(connector);
    }

    #[test]
    fn connector_from_bad_json_returns_null() {
        let json = CString::new(r#"{"url":"http://localhost:3000"}"#).unwrap();
        assert!(snow_connector_from_json(json.as_ptr()).is_null());
        assert!(snow_connector_from_json(std::ptr::null()).is_null());
    }

    #[test]
    fn build_fetch_returns_limited_get() {
        let connector = new_connector("http://localhost:3000");
        let req = snow_build_fetch(connector);
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Get);
        assert_eq!(
            c_str(req_ref.url),
            "http://localhost:3000/api/now/table/change_request?sysparm_limit=1"
        );
        assert!(req_ref.body.is_null());
        assert_eq!(req_ref.headers_len, 2);

        let headers =
            unsafe { std::slice::from_raw_parts(req_ref.headers, req_ref.headers_len as usize) };
        assert_eq!(c_str(headers[0].key), "authorization");
        assert_eq!(c_str(headers[0].value), "Basic YWRtaW46czNjcmV0");

        snow_free_request(req);
        snow_connector_free(connector);
    }

    #[test]
    fn build_create_returns_post_without_query() {
        let connector = new_connector("http://localhost:3000");
        let req = snow_build_create(connector);
        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Post);
        assert_eq!(
            c_str(req_ref.url),
            "http://localhost:3000/api/now/table/change_request"
        );

        snow_free_request(req);
        snow_connector_free(connector);
    }

    #[test]
    fn build_null_connector_returns_null() {
        assert!(snow_build_fetch(std::ptr::null()).is_null());
        assert!(snow_build_create(std::ptr::null()).is_null());
    }

    #[test]
    fn classify_success() {
        let connector = new_connector("http://localhost:3000");
        let body = CString::new(r#"{"result":[]}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = snow_classify(connector, &resp, std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());

        let data = unsafe { &*r.data };
        assert_eq!(data.status, 200);
        assert_eq!(c_str(data.body), r#"{"result":[]}"#);

        snow_free_result(result);
        snow_connector_free(connector);
    }

    #[test]
    fn classify_hibernating() {
        let connector = new_connector("http://localhost:3000");
        let body = CString::new("<html><body>instance is hibernating</body></html>").unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let err = CString::new("socket hang up").unwrap();
        let result = snow_classify(connector, &resp, err.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Hibernating);
        assert_eq!(c_str(r.error_message), "service is hibernating");
        assert!(r.data.is_null());

        snow_free_result(result);
        snow_connector_free(connector);
    }

    #[test]
    fn classify_transport_error_without_response() {
        let connector = new_connector("http://localhost:3000");
        let err = CString::new("ECONNREFUSED").unwrap();
        let result = snow_classify(connector, std::ptr::null(), err.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Transport);
        assert_eq!(c_str(r.error_message), "there was an error in the request");

        snow_free_result(result);
        snow_connector_free(connector);
    }

    #[test]
    fn classify_null_connector_returns_null_arg() {
        let result = snow_classify(std::ptr::null(), std::ptr::null(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        snow_free_result(result);
    }

    #[test]
    fn fetch_null_connector_calls_back_once_with_error() {
        let mut seen = Seen::default();
        let code = snow_fetch(
            std::ptr::null(),
            Some(record as FfiCallback),
            &mut seen as *mut Seen as *mut c_void,
        );
        assert_eq!(code, FfiErrorCode::NullArg);
        assert_eq!(seen.calls, 1);
        assert_eq!(seen.error.as_deref(), Some("null argument: connector"));
        assert!(seen.status.is_none());
    }

    #[test]
    fn fetch_without_callback_is_rejected() {
        let connector = new_connector("http://localhost:3000");
        let code = snow_fetch(connector, None, std::ptr::null_mut());
        assert_eq!(code, FfiErrorCode::NullArg);
        snow_connector_free(connector);
    }

    #[test]
    fn create_and_fetch_against_mock_server() {
        let base_url = spawn_server(Arc::new(Instance::with_credentials("admin", "s3cret")));
        let connector = new_connector(&base_url);

        let mut seen = Seen::default();
        let code = snow_create(connector, Some(record as FfiCallback), &mut seen as *mut Seen as *mut c_void);
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(seen.calls, 1);
        assert_eq!(seen.status, Some(201));
        assert!(seen.error.is_none());

        let mut seen = Seen::default();
        let code = snow_fetch(connector, Some(record as FfiCallback), &mut seen as *mut Seen as *mut c_void);
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(seen.calls, 1);
        let body: serde_json::Value = serde_json::from_str(seen.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["result"].as_array().unwrap().len(), 1);

        snow_connector_free(connector);
    }

    #[test]
    fn fetch_from_hibernating_instance_reports_message() {
        let instance = Arc::new(Instance::new());
        instance.set_hibernating(true);
        let base_url = spawn_server(instance);
        let connector = new_connector(&base_url);

        let mut seen = Seen::default();
        let code = snow_fetch(connector, Some(record as FfiCallback), &mut seen as *mut Seen as *mut c_void);
        assert_eq!(code, FfiErrorCode::Hibernating);
        assert_eq!(seen.calls, 1);
        assert_eq!(seen.error.as_deref(), Some("service is hibernating"));
        assert!(seen.body.is_none());

        snow_connector_free(connector);
    }

    #[test]
    fn fetch_and_create_against_unreachable_host_report_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let connector = new_connector(&format!("http://127.0.0.1:{port}"));

        let mut seen = Seen::default();
        let code = snow_fetch(connector, Some(record as FfiCallback), &mut seen as *mut Seen as *mut c_void);
        assert_eq!(code, FfiErrorCode::Transport);
        assert_eq!(seen.calls, 1);
        assert!(seen.status.is_none());
        assert!(seen.body.is_none());
        assert_eq!(seen.error.as_deref(), Some("there was an error in the request"));

        let mut seen = Seen::default();
        let code = snow_create(connector, Some(record as FfiCallback), &mut seen as *mut Seen as *mut c_void);
        assert_eq!(code, FfiErrorCode::Transport);
        assert_eq!(seen.calls, 1);
        assert!(seen.status.is_none());
        assert_eq!(seen.error.as_deref(), Some("there was an error in the request"));

        snow_connector_free(connector);
    }

    #[test]
    fn generated_header_lives_in_out_dir() {
        // Absent only when cbindgen could not generate the header.
        if let Some(path) = option_env!("SNOW_CONNECTOR_HEADER") {
            assert!(std::path::Path::new(path).starts_with(env!("OUT_DIR")));
            let header = std::fs::read_to_string(path).unwrap();
            assert!(header.contains("snow_fetch"));
            assert!(header.contains("snow_classify"));
        }
    }

    #[test]
    fn free_functions_accept_null() {
        snow_free_request(std::ptr::null_mut());
        snow_free_result(std::ptr::null_mut());
        snow_free_string(std::ptr::null_mut());
    }
}
