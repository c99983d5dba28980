use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that are reported before (or instead of) doing any work.
///
/// Everything else is propagated as a plain `anyhow::Error`. Missing elevation cells are not an
/// error at all: they are replaced by an all "no data" grid.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid landmass file: {0}")]
    InputFormat(String),

    #[error("output path {} already exists, refusing to overwrite it", .0.display())]
    OutputCollision(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = GenerateError::OutputCollision(PathBuf::from("tiles"));
        assert_eq!(e.to_string(), "output path tiles already exists, refusing to overwrite it");

        let e: anyhow::Error = GenerateError::Configuration("min_level > max_level".into()).into();
        assert!(matches!(e.downcast_ref::<GenerateError>(), Some(GenerateError::Configuration(_))));
    }
}
