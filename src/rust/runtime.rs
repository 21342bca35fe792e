use lazy_static::lazy_static;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;

lazy_static! {
    // The ONNX environment is process-wide; remember the outcome of the first commit.
    static ref ENVIRONMENT: Result<(), String> = init_onnx_environment().map_err(|e| e.to_string());
}

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

// GraphOptimizationLevel is not Copy.
fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("image-labeler")
        .commit()?;
    Ok(())
}

/// Initializes the ONNX Runtime environment once per process.
///
/// Returns the message of the first initialization failure on every call.
pub fn ensure_initialized() -> Result<(), String> {
    ENVIRONMENT.clone()
}

pub fn create_session_builder(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    if let Err(msg) = ensure_initialized() {
        log::warn!("ONNX Runtime environment failed to initialize ({}), using defaults", msg);
    }
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }

    #[test]
    fn test_config_clone_keeps_level() {
        let config = RuntimeConfig {
            inter_threads: 1,
            intra_threads: 3,
            optimization_level: GraphOptimizationLevel::Disable,
        };
        let cloned = config.clone();
        assert_eq!(cloned.intra_threads, 3);
        assert!(matches!(cloned.optimization_level, GraphOptimizationLevel::Disable));
    }
}
