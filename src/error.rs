//! Error types for the genetics engine.

use thiserror::Error;

/// Result alias used throughout the engine
pub type GeneticsResult<T> = Result<T, GeneticsError>;

/// Errors reported by engine operations.
///
/// Every variant is a local, non-fatal outcome: the operation that returned it
/// has left the repository unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneticsError {
    /// Unknown genotype, strain, lineage or breeding record id
    #[error("not found: {0}")]
    NotFound(String),

    /// Both parents of a cross are the same genotype
    #[error("cannot breed genotype {0} with itself")]
    InvalidSelfBreed(String),

    /// A parent id did not resolve in the repository
    #[error("parent genotype not found: {0}")]
    ParentNotFound(String),

    /// A genotype with this id is already stored
    #[error("genotype already exists: {0}")]
    DuplicateGenotype(String),

    /// Research id has no gene unlock mapping
    #[error("unknown research id: {0}")]
    UnknownResearch(String),

    /// A genotype does not carry exactly two alleles for a registered gene
    #[error("genotype {genotype} violates the diploid invariant for gene {gene}")]
    DiploidViolation { genotype: String, gene: String },
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
