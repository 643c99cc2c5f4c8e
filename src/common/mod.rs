//! Process glue shared by the binary: tool naming, signals, error text.

pub mod io;

/// Get the GNU-compatible tool name by stripping the 'f' prefix.
/// e.g., "fbase85" -> "base85"
#[inline]
pub fn gnu_name(binary_name: &str) -> &str {
    binary_name.strip_prefix('f').unwrap_or(binary_name)
}

/// Reset SIGPIPE to default behavior (SIG_DFL) for GNU coreutils compatibility.
/// Rust sets SIGPIPE to SIG_IGN by default, but GNU tools are killed by SIGPIPE
/// (exit code 141 = 128 + 13). This must be called at the start of main().
#[inline]
pub fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

/// Format an IO error message without the "(os error N)" suffix.
/// GNU coreutils prints e.g. "No such file or directory" while Rust's
/// Display impl adds " (os error 2)". This strips the suffix for compat.
pub fn io_error_msg(e: &std::io::Error) -> String {
    if let Some(raw) = e.raw_os_error() {
        let os_err = std::io::Error::from_raw_os_error(raw);
        let msg = format!("{}", os_err);
        msg.replace(&format!(" (os error {})", raw), "")
    } else {
        format!("{}", e)
    }
}

/// Virtual memory page size, falling back to 4KB when it cannot be queried.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnu_name() {
        assert_eq!(gnu_name("fbase85"), "base85");
        assert_eq!(gnu_name("base85"), "base85");
    }

    #[test]
    fn test_page_size_is_sane() {
        let size = page_size();
        assert!(size >= 4096);
        assert_eq!(size % 4, 0);
    }

    #[test]
    fn test_io_error_msg_strips_os_suffix() {
        let e = std::io::Error::from_raw_os_error(2);
        let msg = io_error_msg(&e);
        assert!(!msg.contains("os error"));
    }

    #[test]
    fn test_open_file_streams_contents() {
        use std::io::{Read, Write};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcd\n").unwrap();
        let mut opened = io::open_file(file.path()).unwrap();
        let mut data = Vec::new();
        opened.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"abcd\n");
    }

    #[test]
    fn test_open_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = io::open_file(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_open_file_reads_fifo() {
        use std::ffi::CString;
        use std::io::{Read, Write};
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fifo");
        let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            let mut fifo = std::fs::OpenOptions::new().write(true).open(writer_path).unwrap();
            fifo.write_all(b"abcdabcd").unwrap();
        });

        let mut opened = io::open_file(&path).unwrap();
        let mut data = Vec::new();
        opened.read_to_end(&mut data).unwrap();
        writer.join().unwrap();
        assert_eq!(data, b"abcdabcd");
    }

    #[test]
    fn test_read_full_fills_across_short_reads() {
        struct OneByte<'a>(&'a [u8]);
        impl std::io::Read for OneByte<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let mut buf = [0u8; 4];
        let mut reader = OneByte(b"abcdef");
        assert_eq!(io::read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(io::read_full(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(io::read_full(&mut reader, &mut buf).unwrap(), 0);
    }
}
