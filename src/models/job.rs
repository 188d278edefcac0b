use indexmap::IndexMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Upper bound on designs per job, matching the largest batch the run form accepts.
pub const MAX_DESIGN_COUNT: usize = 20_000;

/// Residue used in a target sequence for positions the generator should fill in.
pub const GAP_RESIDUE: char = '-';

const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Residue code → model index. The gap residue takes the last slot.
static RESIDUE_INDEX: LazyLock<IndexMap<char, u8>> = LazyLock::new(|| {
    AMINO_ACIDS
        .chars()
        .chain(std::iter::once(GAP_RESIDUE))
        .enumerate()
        .map(|(idx, residue)| (residue, idx as u8))
        .collect()
});

/// Errors raised while building a [`Job`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Sequence is empty")]
    EmptySequence,

    #[error("Invalid residue '{residue}' at position {position}")]
    InvalidResidue { position: usize, residue: char },

    #[error("Reference length {reference} does not match target length {target}")]
    LengthMismatch { reference: usize, target: usize },

    #[error("Requested {requested} designs, maximum is {max}")]
    TooManyDesigns { requested: usize, max: usize },
}

/// An ordered sequence of residue codes.
///
/// Lower-case input is accepted and normalized to upper case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResidueSequence(String);

impl ResidueSequence {
    pub fn parse(raw: &str) -> Result<Self, JobError> {
        let normalized: String = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(JobError::EmptySequence);
        }

        if let Some((position, residue)) = normalized
            .chars()
            .enumerate()
            .find(|(_, residue)| !RESIDUE_INDEX.contains_key(residue))
        {
            return Err(JobError::InvalidResidue { position, residue });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of gap positions left for the generator
    pub fn gap_count(&self) -> usize {
        self.0.chars().filter(|c| *c == GAP_RESIDUE).count()
    }
}

impl fmt::Display for ResidueSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request to generate a batch of designs.
///
/// Immutable once built; the controller consumes it by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    target: ResidueSequence,
    reference: ResidueSequence,
    design_count: usize,
}

impl Job {
    /// Build a job whose reference row is the target itself
    pub fn new(target: &str, design_count: usize) -> Result<Self, JobError> {
        let target = ResidueSequence::parse(target)?;
        Self::from_parts(target.clone(), target, design_count)
    }

    /// Build a job with a separate native (reference) sequence
    pub fn with_reference(
        target: &str,
        reference: &str,
        design_count: usize,
    ) -> Result<Self, JobError> {
        let target = ResidueSequence::parse(target)?;
        let reference = ResidueSequence::parse(reference)?;
        Self::from_parts(target, reference, design_count)
    }

    fn from_parts(
        target: ResidueSequence,
        reference: ResidueSequence,
        design_count: usize,
    ) -> Result<Self, JobError> {
        if design_count > MAX_DESIGN_COUNT {
            return Err(JobError::TooManyDesigns {
                requested: design_count,
                max: MAX_DESIGN_COUNT,
            });
        }
        if reference.len() != target.len() {
            return Err(JobError::LengthMismatch {
                reference: reference.len(),
                target: target.len(),
            });
        }

        Ok(Self {
            target,
            reference,
            design_count,
        })
    }

    pub fn target(&self) -> &ResidueSequence {
        &self.target
    }

    pub fn reference(&self) -> &ResidueSequence {
        &self.reference
    }

    pub fn design_count(&self) -> usize {
        self.design_count
    }
}
