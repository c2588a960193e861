// Sample extraction plugin for wls-server.
//
// Exports `ExtractLanguage`, which reports the `lang` attribute of the
// document's `<html>` tag. Build it and copy `libextractor.so` into
// `./plugins/` to run the server end to end.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char};
use std::ptr;

thread_local! {
    // Keeps the last result alive until the next call on the same thread;
    // the host copies it and never frees it.
    static LAST_RESULT: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// # Safety
///
/// `html` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ExtractLanguage(html: *const c_char) -> *const c_char {
    if html.is_null() {
        return ptr::null();
    }
    let html = unsafe { CStr::from_ptr(html) }.to_string_lossy();

    let Some(language) = detect_language(&html).and_then(|lang| CString::new(lang).ok()) else {
        return ptr::null();
    };

    LAST_RESULT.with(|slot| {
        let mut slot = slot.borrow_mut();
        *slot = Some(language);
        slot.as_ref().map_or(ptr::null(), |s| s.as_ptr())
    })
}

/// Returns the value of the `lang` attribute on the first `<html>` tag.
pub fn detect_language(html: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let tag_start = find_html_tag(&lower)?;
    let tag_end = tag_start + lower[tag_start..].find('>')?;
    let tag = &lower[tag_start..tag_end];

    let attr = find_lang_attribute(tag)?;
    let value_start = tag_start + attr;
    let rest = &html[value_start..tag_end];

    let value = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote)?]
        }
        _ => rest
            .split(|c: char| c.is_ascii_whitespace() || c == '/')
            .next()
            .unwrap_or_default(),
    };

    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// `<html` followed by whitespace or `>`, so `<htmlfoo>` does not match.
fn find_html_tag(lower: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = lower[offset..].find("<html") {
        let start = offset + pos;
        match lower.as_bytes().get(start + 5) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' => return Some(start),
            _ => offset = start + 5,
        }
    }
    None
}

// Offset (within `tag`) of the value of a standalone `lang=` attribute.
fn find_lang_attribute(tag: &str) -> Option<usize> {
    let bytes = tag.as_bytes();
    let mut offset = 0;
    while let Some(pos) = tag[offset..].find("lang") {
        let start = offset + pos;
        let standalone = start > 0 && bytes[start - 1].is_ascii_whitespace();
        let after = tag[start + 4..].trim_start();
        if standalone && after.starts_with('=') {
            let value = after[1..].trim_start();
            return Some(tag.len() - value.len());
        }
        offset = start + 4;
    }
    None
}
