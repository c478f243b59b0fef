//! FFI bindings for Restrun
//!
//! This module provides C-compatible functions for calling Restrun from the
//! mobile app shells. All functions take and return JSON in C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `restrun_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::DateTime;

use crate::config::SleepSettings;
use crate::error::AnalysisError;
use crate::pipeline::SleepAnalyzer;
use crate::provider::InMemoryProvider;
use crate::running::PrTracker;
use crate::types::CardioRecord;
use crate::window::AnalysisWindow;

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

/// Turn a computation result into an owned C string, recording any error
fn finish(result: Result<String, AnalysisError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn sleep_report_json(
    samples_json: &str,
    now_rfc3339: &str,
    settings_json: Option<&str>,
) -> Result<String, AnalysisError> {
    let now = DateTime::parse_from_rfc3339(now_rfc3339)
        .map_err(|e| AnalysisError::ParseError(format!("invalid timestamp: {}", e)))?;
    let settings = match settings_json {
        Some(json) => SleepSettings::from_json(json)?,
        None => SleepSettings::default(),
    };

    let window = AnalysisWindow::last_night(&now)?;
    let provider = InMemoryProvider::from_json_array(samples_json)?;
    let analyzer = SleepAnalyzer::with_registry(provider, settings.registry.clone());
    let report = analyzer.nightly_report(&window, &settings)?;

    Ok(serde_json::to_string(&report)?)
}

fn parse_history(history_json: &str) -> Result<Vec<CardioRecord>, AnalysisError> {
    Ok(serde_json::from_str(history_json)?)
}

fn new_prs_json(
    candidate_json: &str,
    history_json: &str,
    is_edit: bool,
) -> Result<String, AnalysisError> {
    let candidate: CardioRecord = serde_json::from_str(candidate_json)?;
    let history = parse_history(history_json)?;
    let labels = PrTracker::evaluate_new_prs(&candidate, &history, is_edit);
    Ok(serde_json::to_string(&labels)?)
}

fn personal_bests_json(history_json: &str) -> Result<String, AnalysisError> {
    let history = parse_history(history_json)?;
    Ok(serde_json::to_string(&PrTracker::personal_bests(&history))?)
}

// ============================================================================
// Sleep API
// ============================================================================

/// Compute last night's sleep report from a JSON array of samples.
///
/// `now_rfc3339` carries the caller's local offset, which decides where the
/// noon-to-noon window falls. `settings_json` may be NULL for default settings.
///
/// # Safety
/// - `samples_json` and `now_rfc3339` must be valid null-terminated C strings.
/// - `settings_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `restrun_free_string`.
/// - Returns NULL on error; call `restrun_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn restrun_sleep_report(
    samples_json: *const c_char,
    now_rfc3339: *const c_char,
    settings_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let now_str = match cstr_to_string(now_rfc3339) {
        Some(s) => s,
        None => {
            set_last_error("Invalid timestamp string pointer");
            return ptr::null_mut();
        }
    };

    let settings_str = if settings_json.is_null() {
        None
    } else {
        match cstr_to_string(settings_json) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid settings string pointer");
                return ptr::null_mut();
            }
        }
    };

    finish(sleep_report_json(
        &samples_str,
        &now_str,
        settings_str.as_deref(),
    ))
}

// ============================================================================
// Running API
// ============================================================================

/// Evaluate which PRs a created or edited run earns.
///
/// Returns a JSON array of PR labels.
///
/// # Safety
/// - `candidate_json` and `history_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `restrun_free_string`.
/// - Returns NULL on error; call `restrun_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn restrun_evaluate_new_prs(
    candidate_json: *const c_char,
    history_json: *const c_char,
    is_edit: bool,
) -> *mut c_char {
    clear_last_error();

    let candidate_str = match cstr_to_string(candidate_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid candidate string pointer");
            return ptr::null_mut();
        }
    };

    let history_str = match cstr_to_string(history_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid history string pointer");
            return ptr::null_mut();
        }
    };

    finish(new_prs_json(&candidate_str, &history_str, is_edit))
}

/// Compute current personal bests for a JSON array of cardio records.
///
/// # Safety
/// - `history_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `restrun_free_string`.
/// - Returns NULL on error; call `restrun_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn restrun_personal_bests(history_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let history_str = match cstr_to_string(history_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid history string pointer");
            return ptr::null_mut();
        }
    };

    finish(personal_bests_json(&history_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Restrun functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Restrun function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn restrun_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Restrun function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn restrun_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Restrun library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn restrun_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
