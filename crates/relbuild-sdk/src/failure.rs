//! Fatal-failure reporting.
//!
//! Every failure, whatever step it came from, ends the run the same way: the
//! diagnostic, then a fixed banner, then exit status [`FAILURE_EXIT_CODE`].

use std::fmt::Display;
use std::io::{self, Write};

/// Banner written after the diagnostic of a failed build.
pub const FAILURE_BANNER: &str = "BUILD FAILED!!! LOOK AT MESSAGES ABOVE";

/// Process exit status for any failed run.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// Writes `message` followed by the failure banner.
pub fn write_failure<W: Write>(out: &mut W, message: &dyn Display) -> io::Result<()> {
    writeln!(out, "{}", message)?;
    write!(out, "\n\n{}\n\n", FAILURE_BANNER)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_layout() {
        let mut buf = Vec::new();
        write_failure(&mut buf, &"Failed to execute 'make -j8' (exit status: 2)").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Failed to execute 'make -j8' (exit status: 2)\n\n\nBUILD FAILED!!! LOOK AT MESSAGES ABOVE\n\n"
        );
    }
}
