mod settings;

pub use settings::{
    Config, DispatchConfig, RecordConfig, ReportConfig, ScrubSettings, TomlConfig,
    EXAMPLE_CONFIG,
};
