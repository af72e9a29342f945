/// Render one diagnostic line into a stack buffer and append it to the
/// per-process log. No-op when logging is unconfigured or failed.
///
/// # Usage:
/// ```ignore
/// preload_log!(OpenEvent { entry: "open", path, flags, mode, fd });
/// ```
#[macro_export]
macro_rules! preload_log {
    ($event:expr) => {
        $crate::state::log_line(|w| $event.write_line(w))
    };
}

/// Write straight to stderr, bypassing std's buffered handle.
#[macro_export]
macro_rules! preload_stderr {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let mut buf = [0u8; $crate::macros::LINE_BUF_SIZE];
        let mut writer = $crate::macros::StackWriter::new(&mut buf);
        let _ = writeln!(writer, $($arg)*);
        writer.finish_line();
        let bytes = writer.as_bytes();
        unsafe {
            libc::write(2, bytes.as_ptr() as *const libc::c_void, bytes.len());
        }
    }};
}

/// Room for a `PATH_MAX` path plus the surrounding event text.
pub const LINE_BUF_SIZE: usize = libc::PATH_MAX as usize + 256;

/// Fixed-size sink that silently truncates instead of allocating.
pub struct StackWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    truncated: bool,
}

impl<'a> StackWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            truncated: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Keep the line terminated even when its tail was cut off.
    pub fn finish_line(&mut self) {
        if self.truncated && self.pos > 0 {
            self.buf[self.pos - 1] = b'\n';
        }
    }
}

impl std::io::Write for StackWriter<'_> {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        let remaining = self.buf.len() - self.pos;
        let to_copy = std::cmp::min(bytes.len(), remaining);
        self.buf[self.pos..self.pos + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.pos += to_copy;
        if to_copy < bytes.len() {
            self.truncated = true;
        }
        // Claim the whole input so write_all never reports WriteZero
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
