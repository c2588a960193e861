// Rust definitions for the C ABI exported by extraction plugins.
//
// A plugin is a shared library exporting:
//
//     const char* ExtractLanguage(const char* html);
//
// `html` is a NUL-terminated UTF-8 string. The return value is a
// NUL-terminated UTF-8 string owned by the plugin, or NULL when no
// language could be detected. The host never frees the returned pointer.

use std::os::raw::c_char;

pub type ExtractLanguageFn = unsafe extern "C" fn(html: *const c_char) -> *const c_char;

pub const EXTRACT_LANGUAGE_SYMBOL: &str = "ExtractLanguage";

// Symbol name as passed to the dynamic loader.
pub const EXTRACT_LANGUAGE_SYMBOL_NUL: &[u8] = b"ExtractLanguage\0";
