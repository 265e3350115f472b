//! Domain error types.

/// Top-level error type for equitrack.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{name} dtype is {dtype}, expected bool (convert the column to bool first)")]
    SignalType { name: String, dtype: String },

    #[error("index of {left} does not match index of {right}")]
    IndexMismatch { left: String, right: String },

    #[error("no entry signal present: need long_entry/short_entry or long/short")]
    MissingEntrySignal,

    #[error("signal set mixes entry/exit names with long/short state names")]
    MixedSignalVocabulary,

    #[error("{exit} given without {entry}")]
    OrphanExitSignal { exit: String, entry: String },

    #[error("series has {index} timestamps but {values} values")]
    LengthMismatch { index: usize, values: usize },

    #[error("series index is not ordered at position {position}")]
    UnorderedIndex { position: usize },

    #[error("out of order: {attempted} is earlier than last recorded {last}")]
    OutOfOrder { attempted: String, last: String },

    #[error("unknown statistic `{name}`")]
    UnknownStatistic { name: String },

    #[error("cannot calculate {what} on empty data")]
    EmptyData { what: String },

    #[error("statistic {statistic} is undefined: {reason}")]
    DegenerateStatistic { statistic: String, reason: String },

    #[error("unsupported statistics mode `{mode}`")]
    UnsupportedStatisticsMode { mode: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("insufficient data for {what}: have {have}, need {need}")]
    InsufficientData { what: String, have: usize, need: usize },

    #[error("invalid trade direction `{0}` (expected buy or sell)")]
    InvalidDirection(String),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Data { .. }
            | EngineError::LengthMismatch { .. }
            | EngineError::UnorderedIndex { .. }
            | EngineError::InvalidDirection(_) => 3,
            EngineError::SignalType { .. }
            | EngineError::IndexMismatch { .. }
            | EngineError::MissingEntrySignal
            | EngineError::MixedSignalVocabulary
            | EngineError::OrphanExitSignal { .. } => 4,
            EngineError::OutOfOrder { .. } => 5,
            EngineError::UnknownStatistic { .. }
            | EngineError::EmptyData { .. }
            | EngineError::DegenerateStatistic { .. }
            | EngineError::UnsupportedStatisticsMode { .. }
            | EngineError::InvalidParameter { .. }
            | EngineError::InsufficientData { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
