use std::ffi::CStr;
use std::os::raw::c_char;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize `value` to a JSON string.
pub fn to_json(value: &impl Serialize) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

/// Parse `json` into `T`.
pub fn deserialize_json<T: DeserializeOwned>(json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))
}

/// Borrow the null-terminated C string at `ptr` and return it as an owned
/// `String`.
///
/// # Safety
///
/// `ptr` must be null or point to a null-terminated string that stays alive
/// for the duration of this call.
pub unsafe fn cstring_to_str(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("received null pointer".to_string());
    }

    CStr::from_ptr(ptr)
        .to_str()
        .map(|s| s.to_owned())
        .map_err(|e| format!("invalid UTF-8 in C string: {e}"))
}

/// Parse an optional JSON configuration: a null pointer or a blank string
/// yields `T::default()`.
///
/// # Safety
///
/// Same contract as [`cstring_to_str`].
pub unsafe fn optional_config<T: DeserializeOwned + Default>(ptr: *const c_char) -> Result<T, String> {
    if ptr.is_null() {
        return Ok(T::default());
    }
    let json = cstring_to_str(ptr)?;
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    deserialize_json(&json)
}
