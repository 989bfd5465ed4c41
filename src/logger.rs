//! A logger that accumulates messages in a vector buffer.
//!
//! The buffered messages can be drained all at once and interleaved with
//! simulation output, e.g. to group the log lines produced between two
//! clock advances. There is no global buffer: [`LoggerBuilder::init`]
//! returns the [`LogBuffer`] handle that collects the messages.
//!
//! # Examples
//!
//! ```
//! # fn main() -> Result<(), log::SetLoggerError> {
//! let buffer = simpm::logger::LoggerBuilder::default()
//!     .level(log::LevelFilter::Trace)
//!     .init()?;
//! log::info!("Info message");
//! log::warn!("Warn message");
//! assert_eq!(
//!     buffer.drain(),
//!     vec![
//!         String::from("[INFO]  Info message"),
//!         String::from("[WARN]  Warn message"),
//!     ]
//! );
//! // Only messages logged since the last drain are returned.
//! log::error!("Error message");
//! assert_eq!(buffer.drain(), vec![String::from("[ERROR] Error message")]);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, RwLock};

use log::LevelFilter;

/// Handle to the message buffer of an installed logger.
#[derive(Clone, Default)]
pub struct LogBuffer {
    messages: Arc<RwLock<Vec<String>>>,
}

impl LogBuffer {
    /// Clears the buffer and returns its contents.
    pub fn drain(&self) -> Vec<String> {
        self.messages
            .write()
            .expect("poisoned log buffer lock")
            .drain(..)
            .collect()
    }

    fn push(&self, message: String) {
        self.messages
            .write()
            .expect("poisoned log buffer lock")
            .push(message);
    }
}

/// Builds a vector logger.
pub struct LoggerBuilder {
    level: LevelFilter,
    target: Option<String>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            target: None,
        }
    }
}

impl LoggerBuilder {
    /// Sets level filter.
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Sets logging target prefix.
    pub fn target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Installs the logger and returns the handle to its buffer.
    ///
    /// # Errors
    ///
    /// Fails if another logger has already been installed in this process.
    pub fn init(self) -> Result<LogBuffer, log::SetLoggerError> {
        let buffer = LogBuffer::default();
        let sink = buffer.clone();
        let mut dispatch = fern::Dispatch::new()
            .level(self.level)
            .chain(fern::Output::call(move |record| {
                sink.push(format!(
                    "{:7} {}",
                    format!("[{}]", record.level()),
                    record.args()
                ));
            }));
        if let Some(target) = self.target {
            dispatch = dispatch.filter(move |metadata| metadata.target().starts_with(&target));
        }
        dispatch.apply()?;
        Ok(buffer)
    }
}
