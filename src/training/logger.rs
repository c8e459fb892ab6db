//! Structured training output.

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Verbosity {
    /// No output (default).
    #[default]
    Silent,
    /// Errors and warnings only.
    Warning,
    /// Per-round progress and important information.
    Info,
    /// Detailed debugging information.
    Debug,
}

/// Writes training progress to stderr, gated on a [`Verbosity`] level.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    /// A logger gated at the given verbosity.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// The configured verbosity.
    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Log a warning.
    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            eprintln!("[binboost] warning: {message}");
        }
    }

    /// Log progress information.
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Info {
            eprintln!("[binboost] {message}");
        }
    }

    /// Log debugging detail.
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Debug {
            eprintln!("[binboost] debug: {message}");
        }
    }

    /// Log one boosting round with its named metric values.
    pub fn log_round(&self, round: usize, metrics: &[(&str, f64)]) {
        if self.verbosity < Verbosity::Info {
            return;
        }
        let rendered: Vec<String> = metrics
            .iter()
            .map(|(name, value)| format!("{name}={value:.6}"))
            .collect();
        eprintln!("[binboost] round {round}: {}", rendered.join(" "));
    }
}
