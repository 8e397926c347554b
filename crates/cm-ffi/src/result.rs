use std::ffi::CString;
use std::os::raw::c_char;

/// C-compatible result envelope for all FFI calls.
///
/// Both `data` and `error` are heap-allocated C strings owned by this struct.
/// The caller releases the envelope and its strings with `cmark_free`.
#[repr(C)]
pub struct CmarkResult {
    /// `true` on success, `false` on failure.
    pub ok: bool,
    /// JSON payload on success; null pointer on failure.
    pub data: *mut c_char,
    /// Error message on failure; null pointer on success.
    pub error: *mut c_char,
}

impl CmarkResult {
    /// Allocate a successful result whose data field holds `json`.
    ///
    /// Ownership of the returned pointer passes to the caller.
    pub fn success(json: &str) -> *mut Self {
        Box::into_raw(Box::new(CmarkResult {
            ok: true,
            data: into_raw_cstring(json),
            error: std::ptr::null_mut(),
        }))
    }

    /// Allocate a failure result whose error field holds `message`.
    ///
    /// Ownership of the returned pointer passes to the caller.
    pub fn failure(message: &str) -> *mut Self {
        Box::into_raw(Box::new(CmarkResult {
            ok: false,
            data: std::ptr::null_mut(),
            error: into_raw_cstring(message),
        }))
    }

    /// Reclaim ownership of the inner C strings and the struct itself.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer produced by [`CmarkResult::success`] or
    /// [`CmarkResult::failure`] that has not been freed already.
    pub unsafe fn free(ptr: *mut Self) {
        if ptr.is_null() {
            return;
        }

        let result = Box::from_raw(ptr);
        if !result.data.is_null() {
            drop(CString::from_raw(result.data));
        }
        if !result.error.is_null() {
            drop(CString::from_raw(result.error));
        }
    }
}

/// Interior NUL bytes cannot cross the C boundary; they are dropped.
fn into_raw_cstring(value: &str) -> *mut c_char {
    let bytes: Vec<u8> = value.bytes().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}
