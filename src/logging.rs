//! A minimal diagnostic logging shim.
//!
//! This crate deliberately doesn't pull in a structured logging framework.
//! [`log`] just writes to stderr, so a server embedding this crate can
//! redirect or silence it with ordinary process-level stderr handling.
//!
//! # Examples
//!
//! ```
//! # mod logging {
//! #     pub fn log(str: &str) {
//! #         eprintln!("{}", str);
//! #     }
//! # }
//! # use logging::log;
//!
//! // Simple logging
//! log("Application started");
//!
//! // Logging with formatted strings
//! let port = 8080;
//! log(&format!("Server listening on port {}", port));
//!
//! // Error reporting
//! match std::fs::read_to_string("config.json") {
//!     Ok(_) => log("Configuration loaded"),
//!     Err(e) => log(&format!("Failed to load config: {}", e)),
//! }
//! ```

/// Logs a message to stderr, leaving stdout free for protocol traffic.
///
/// # Examples
///
/// ## Basic usage
/// ```
/// # mod logging {
/// #     pub fn log(str: &str) {
/// #         eprintln!("{}", str);
/// #     }
/// # }
/// # use logging::log;
///
/// log("Starting initialization");
/// log("Initialization complete");
/// ```
///
/// ## With runtime values
/// ```
/// # mod logging {
/// #     pub fn log(str: &str) {
/// #         eprintln!("{}", str);
/// #     }
/// # }
/// # use logging::log;
///
/// let user_count = 42;
/// log(&format!("Active users: {}", user_count));
///
/// let config = "production";
/// log(&format!("Running in {} mode", config));
/// ```
///
/// ## Error handling patterns
/// ```
/// # mod logging {
/// #     pub fn log(str: &str) {
/// #         eprintln!("{}", str);
/// #     }
/// # }
/// # use logging::log;
/// use std::fs::File;
///
/// match File::open("data.txt") {
///     Ok(_) => log("File opened successfully"),
///     Err(e) => log(&format!("Error opening file: {}", e)),
/// }
/// ```
///
/// # Performance considerations
///
/// This performs a blocking write and should not sit in a hot loop. For
/// high-frequency diagnostics, a real structured logger is a better fit
/// than this function.
pub fn log(str: &str) {
    eprintln!("{}", str);
}
