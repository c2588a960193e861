// Loads the language extraction plugin from a shared library and
// exposes it to the request handlers through the `LanguageExtractor` trait.

use crate::error::LoadError;
use crate::plugin_ffi;
use libloading::{Library, Symbol};
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Detects the language of an HTML document.
///
/// Implementations are not required to be reentrant: the server never
/// calls `extract_language` concurrently.
pub trait LanguageExtractor {
    fn extract_language(&self, html: &[u8]) -> Option<String>;
}

impl<F> LanguageExtractor for F
where
    F: Fn(&[u8]) -> Option<String>,
{
    fn extract_language(&self, html: &[u8]) -> Option<String> {
        self(html)
    }
}

// A loaded plugin library together with its resolved entry point.
// The library is unloaded when this value is dropped, so the function
// pointer must never outlive it.
pub struct LoadedPlugin {
    path: PathBuf,
    extract_language: plugin_ffi::ExtractLanguageFn,
    _lib: Library,
}

impl LoadedPlugin {
    /// Loads the shared library at `path` and resolves `ExtractLanguage`.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisation routines, and the exported
    /// symbol is trusted to match `plugin_ffi::ExtractLanguageFn`.
    pub unsafe fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        debug!("Attempting to load plugin from: {:?}", path);

        let lib = unsafe { Library::new(&path) }.map_err(|e| LoadError::ModuleNotFound {
            path: path.clone(),
            source: e,
        })?;

        let extract_language: plugin_ffi::ExtractLanguageFn = {
            let symbol: Symbol<plugin_ffi::ExtractLanguageFn> =
                unsafe { lib.get(plugin_ffi::EXTRACT_LANGUAGE_SYMBOL_NUL) }.map_err(|e| {
                    LoadError::SymbolNotFound {
                        path: path.clone(),
                        symbol: plugin_ffi::EXTRACT_LANGUAGE_SYMBOL,
                        source: e,
                    }
                })?;
            *symbol
        };

        info!("Loaded plugin from {:?}", path);
        Ok(LoadedPlugin {
            path,
            extract_language,
            _lib: lib,
        })
    }
}

impl LanguageExtractor for LoadedPlugin {
    fn extract_language(&self, html: &[u8]) -> Option<String> {
        trace!("{:?}: Calling ExtractLanguage with {} bytes", self.path, html.len());
        // The library stays loaded for as long as `self` lives.
        unsafe { call_extract_language(self.extract_language, html) }
    }
}

// Passes `html` to the plugin entry point and copies the result out.
//
// Safety: `extract_language` must be callable, i.e. its library still loaded.
unsafe fn call_extract_language(
    extract_language: plugin_ffi::ExtractLanguageFn,
    html: &[u8],
) -> Option<String> {
    let input = to_c_string(html);
    let result = unsafe { extract_language(input.as_ptr()) };
    if result.is_null() {
        return None;
    }
    // The plugin owns `result`; copy it out and leave the memory alone.
    let language = unsafe { CStr::from_ptr(result) };
    Some(language.to_string_lossy().into_owned())
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        info!("Unloading plugin: {:?}", self.path);
    }
}

// A C string ends at the first NUL, so anything after an embedded NUL in
// the body is invisible to the plugin.
fn to_c_string(bytes: &[u8]) -> CString {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::raw::c_char;

    #[test]
    fn test_load_missing_module() {
        let result = unsafe { LoadedPlugin::load("/nonexistent/wls/libextractor.so") };
        match result {
            Err(LoadError::ModuleNotFound { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/wls/libextractor.so"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("loading a missing module must fail"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_load_module_without_entry_point() {
        // libc is always loadable and does not export ExtractLanguage.
        let result = unsafe { LoadedPlugin::load("libc.so.6") };
        match result {
            Err(LoadError::SymbolNotFound { symbol, .. }) => {
                assert_eq!(symbol, "ExtractLanguage");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("libc does not export ExtractLanguage"),
        }
    }

    // Returns its input, so the result shows exactly what the plugin received.
    unsafe extern "C" fn echo(html: *const c_char) -> *const c_char {
        html
    }

    unsafe extern "C" fn always_null(_: *const c_char) -> *const c_char {
        std::ptr::null()
    }

    unsafe extern "C" fn static_language(_: *const c_char) -> *const c_char {
        c"de".as_ptr()
    }

    #[test]
    fn test_call_extract_language_null_is_absent() {
        let result = unsafe { call_extract_language(always_null, b"<html lang=\"de\">") };
        assert_eq!(result, None);
    }

    #[test]
    fn test_call_extract_language_copies_plugin_string() {
        let result = unsafe { call_extract_language(static_language, b"<p>hallo</p>") };
        assert_eq!(result, Some("de".to_string()));
        // The plugin's static string is still intact after the copy.
        assert_eq!(unsafe { static_language(std::ptr::null()) }, c"de".as_ptr());
    }

    #[test]
    fn test_call_extract_language_body_cut_at_nul() {
        let html = b"<html lang=\"de\">x\0<html lang=\"fr\">";
        let result = unsafe { call_extract_language(echo, html) };
        assert_eq!(result, Some("<html lang=\"de\">x".to_string()));

        let result = unsafe { call_extract_language(echo, b"\0<html lang=\"fr\">") };
        assert_eq!(result, Some(String::new()));
    }

    #[test]
    fn test_call_extract_language_invalid_utf8_is_lossy() {
        let result = unsafe { call_extract_language(echo, b"caf\xe9") };
        assert_eq!(result, Some("caf\u{fffd}".to_string()));
    }

    #[test]
    fn test_to_c_string_stops_at_nul() {
        assert_eq!(to_c_string(b"<html>").as_bytes(), b"<html>");
        assert_eq!(to_c_string(b"<p>a\0b</p>").as_bytes(), b"<p>a");
        assert_eq!(to_c_string(b"").as_bytes(), b"");
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |html: &[u8]| {
            if html.starts_with(b"<html lang") {
                Some("en".to_string())
            } else {
                None
            }
        };
        assert_eq!(
            extractor.extract_language(b"<html lang=\"en\">"),
            Some("en".to_string())
        );
        assert_eq!(extractor.extract_language(b"<body>"), None);
    }
}
