use crc32fast::Hasher;

/// Continues a running CRC-32 with the bytes of the buffer and returns the
/// updated value. Start with 0. The result matches zlib's `crc32`
pub fn crc32(running: u32, buffer: impl AsRef<[u8]>) -> u32 {
    let mut hasher = Hasher::new_with_initial(running);
    hasher.update(buffer.as_ref());
    hasher.finalize()
}

/// Returns the version string of the linked zlib library, or
/// an empty string if the crate is not built against zlib
pub fn engine_version() -> String {
    linked_version().unwrap_or_default()
}

#[cfg(feature = "zlib")]
fn linked_version() -> Option<String> {
    // SAFETY: zlibVersion returns either null or a pointer to a static
    // NUL-terminated string owned by the library
    let version = unsafe { libz_sys::zlibVersion() };
    if version.is_null() {
        return None;
    }

    let version = unsafe { std::ffi::CStr::from_ptr(version) };
    Some(version.to_string_lossy().into_owned())
}

#[cfg(not(feature = "zlib"))]
fn linked_version() -> Option<String> {
    None
}
