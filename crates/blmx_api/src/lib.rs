use std::ffi::{c_char, CString};

use blmx_common::serde_json;

pub mod api;

pub use api::{call, dispatch, Api, ApiError, ApiResult};

fn call_json(api_json: &[u8]) -> ApiResult {
    let api_json = match std::str::from_utf8(api_json) {
        Ok(json) => json,
        Err(err) => {
            return ApiResult::Error {
                message: format!("request is not valid UTF-8: {}", err),
            }
        }
    };
    match serde_json::from_str::<Api>(api_json) {
        Ok(api) => dispatch(api),
        Err(err) => ApiResult::Error {
            message: format!("failed to parse JSON: {}\n JSON: `{}`", err, api_json),
        },
    }
}

/// Runs one JSON-encoded [`Api`] call and returns the JSON-encoded [`ApiResult`].
/// The returned string must be released with [`blmx_free_string`].
///
/// # Safety
/// `api` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn blmx_call(api: *const c_char, len: u64) -> *mut c_char {
    let api_json = std::slice::from_raw_parts(api as *const u8, len as usize);
    let result = call_json(api_json);
    let result_json = serde_json::to_string(&result).unwrap_or_else(|err| {
        format!(r#"{{"Error":{{"message":"failed to encode result: {}"}}}}"#, err)
    });
    match CString::new(result_json) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// # Safety
/// `s` must come from [`blmx_call`] and not have been freed yet.
#[no_mangle]
pub unsafe extern "C" fn blmx_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}
