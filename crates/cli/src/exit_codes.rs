//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `clusterprice`.
//! Scheduled jobs branch on them, so they are part of the contract.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, workbook written                            |
//! | 1    | General error (log file, report file)                |
//! | 2    | Usage error (bad or missing arguments, from clap)    |
//! | 3    | Config file unreadable or invalid                    |
//! | 4    | Source file unreadable (missing, corrupt, no sheet)  |
//! | 5    | Source lacks a required column                       |
//! | 6    | Join fanned out and `join.on_duplicate = "fail"`     |
//! | 7    | Output workbook could not be written                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map the error onto it in `run.rs`

/// Success - analysis workbook written.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - clap exits with this on bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config file cannot be read, parsed or validated.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// A source file is missing, corrupt, lacks its sheet, or is shorter
/// than its header row.
pub const EXIT_SOURCE_UNREADABLE: u8 = 4;

/// A source or an intermediate table lacks a required column.
pub const EXIT_SCHEMA: u8 = 5;

/// A join created duplicate rows and the config asks to fail on it.
pub const EXIT_DUPLICATE_KEYS: u8 = 6;

/// The output workbook could not be written.
pub const EXIT_OUTPUT_WRITE: u8 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG_INVALID,
            EXIT_SOURCE_UNREADABLE,
            EXIT_SCHEMA,
            EXIT_DUPLICATE_KEYS,
            EXIT_OUTPUT_WRITE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
