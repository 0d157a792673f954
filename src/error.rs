//! Process exit codes.

/// Exit codes for the audiodupe application.
///
/// - 0: Success (run completed; an interrupted-but-resumable run also exits 0)
/// - 1: General error (unexpected failure)
/// - 2: Environment error (missing fpcalc/ffprobe, or target directory missing)
/// - 3: Partial success (run completed but some files failed processing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Run completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// A required external tool or the target directory is unavailable.
    EnvironmentError = 2,
    /// Run completed but some files could not be fingerprinted.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
