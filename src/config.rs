/// How a table assigns timestamps to updates that do not carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TimeMode {
    /// Wall-clock milliseconds, clamped to be monotonically non-decreasing
    /// per table.
    #[default]
    Millis,
    /// A per-table counter that ticks once per applied mutation.
    Logical,
}

/// Runtime configuration for a celldb instance.
#[derive(Debug, Clone)]
pub struct CelldbConfig {
    pub instance_name: String,
    /// Mutations buffered by a batch writer before an implicit flush.
    pub writer_buffer_mutations: usize,
    /// Time mode used for tables created without an explicit one.
    pub default_time_mode: TimeMode,
}

impl Default for CelldbConfig {
    fn default() -> Self {
        Self {
            instance_name: "celldb".to_string(),
            writer_buffer_mutations: 10_000,
            default_time_mode: TimeMode::Millis,
        }
    }
}

pub(crate) fn validate_config(config: &CelldbConfig) -> Result<(), crate::error::CelldbError> {
    if config.instance_name.is_empty() {
        return Err(crate::error::CelldbError::InvalidConfig {
            message: "instance_name must not be empty".into(),
        });
    }
    if config.writer_buffer_mutations == 0 {
        return Err(crate::error::CelldbError::InvalidConfig {
            message: "writer_buffer_mutations must be at least 1".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CelldbConfig, validate_config};

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CelldbConfig::default()).is_ok());
    }

    #[test]
    fn zero_writer_buffer_is_rejected() {
        let config = CelldbConfig {
            writer_buffer_mutations: 0,
            ..CelldbConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
