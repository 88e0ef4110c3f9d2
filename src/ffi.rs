//! FFI bindings for Moment Insights
//!
//! This module provides C-compatible functions for calling the insight engine
//! from other languages. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `moment_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::InsightConfig;
use crate::error::ComputeError;
use crate::pipeline::{checkins_to_interference_json, events_to_insight_json, InsightProcessor};
use crate::window::WeekWindowCalculator;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn windows_json(now: &str) -> Result<String, ComputeError> {
    let now: DateTime<Utc> = DateTime::parse_from_rfc3339(now)
        .map_err(|e| ComputeError::InvalidTimestamp(format!("{}: {}", now, e)))?
        .with_timezone(&Utc);
    let windows = WeekWindowCalculator::compute_windows(now)?;
    Ok(serde_json::to_string(&windows)?)
}

fn interference_json(checkins_json: &str, day: Option<&str>) -> Result<String, ComputeError> {
    let day = match day {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| ComputeError::InvalidTimestamp(format!("{}: {}", d, e)))?,
        None => Utc::now().date_naive(),
    };
    checkins_to_interference_json(checkins_json, day)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute the three week windows for an instant.
///
/// `now` is an RFC3339 timestamp, or NULL for the current time. The result is
/// a JSON array of windows, most recent first.
///
/// # Safety
/// - `now` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `moment_free_string`.
/// - Returns NULL on error; call `moment_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moment_compute_windows(now: *const c_char) -> *mut c_char {
    clear_last_error();

    let now_str = if now.is_null() {
        Utc::now().to_rfc3339()
    } else {
        match cstr_to_string(now) {
            Some(s) => s,
            None => {
                set_last_error("Invalid timestamp string pointer");
                return ptr::null_mut();
            }
        }
    };

    finish(windows_json(&now_str))
}

/// Classify a JSON array of one window's moment records into payload JSON.
///
/// # Safety
/// - `events_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `moment_free_string`.
/// - Returns NULL on error; call `moment_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moment_classify(events_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    finish(events_to_insight_json(&json_str))
}

/// Summarize the calendar week of interference check-ins containing `day`.
///
/// `day` is a `YYYY-MM-DD` date, or NULL for today (UTC).
///
/// # Safety
/// - `checkins_json` must be a valid null-terminated C string.
/// - `day` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `moment_free_string`.
/// - Returns NULL on error; call `moment_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moment_interference_summary(
    checkins_json: *const c_char,
    day: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(checkins_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let day_str = if day.is_null() {
        None
    } else {
        match cstr_to_string(day) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid date string pointer");
                return ptr::null_mut();
            }
        }
    };

    finish(interference_json(&json_str, day_str.as_deref()))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an InsightProcessor
pub struct InsightProcessorHandle {
    processor: InsightProcessor,
}

/// Create a new InsightProcessor with default thresholds.
///
/// A zero `seed` draws sparse-tier wording from entropy; any other value
/// makes the wording reproducible.
///
/// # Safety
/// - Returns a pointer to a newly allocated InsightProcessor.
/// - Must be freed with `moment_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn moment_processor_new(seed: u64) -> *mut InsightProcessorHandle {
    clear_last_error();

    let processor = if seed == 0 {
        InsightProcessor::new()
    } else {
        InsightProcessor::seeded(InsightConfig::default(), seed)
    };
    Box::into_raw(Box::new(InsightProcessorHandle { processor }))
}

/// Free an InsightProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `moment_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn moment_processor_free(processor: *mut InsightProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Classify moment records with a stateful processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `moment_processor_new`.
/// - `events_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `moment_free_string`.
/// - Returns NULL on error; call `moment_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moment_processor_process(
    processor: *mut InsightProcessorHandle,
    events_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    finish(handle.processor.process(&json_str, None))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by moment functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a moment function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn moment_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next moment function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn moment_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn moment_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
