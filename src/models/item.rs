use super::job::Job;

/// Number of seed rows (Reference, Target) at the head of every result list
pub const SEED_COUNT: usize = 2;

/// One row of a job's result list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedItem {
    pub id: usize,
    pub label: String,
    pub sequence: String,
    pub is_reference: bool,
}

impl GeneratedItem {
    /// The two seed rows for a job, ids 0 and 1
    pub fn seeds(job: &Job) -> [GeneratedItem; SEED_COUNT] {
        [
            GeneratedItem {
                id: 0,
                label: "Reference".to_string(),
                sequence: job.reference().to_string(),
                is_reference: true,
            },
            GeneratedItem {
                id: 1,
                label: "Target".to_string(),
                sequence: job.target().to_string(),
                is_reference: true,
            },
        ]
    }

    /// Alignment-view row, label padded to ten columns
    pub fn alignment_row(&self) -> String {
        format!("{:10}: {}", self.label, self.sequence)
    }
}

/// A design as produced by a worker, before the controller assigns it an id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Design {
    pub label: Option<String>,
    pub sequence: String,
}

impl Design {
    pub fn new(sequence: impl Into<String>) -> Self {
        Self {
            label: None,
            sequence: sequence.into(),
        }
    }

    pub fn labeled(label: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            sequence: sequence.into(),
        }
    }
}

/// Append-only result list for one job
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultList {
    items: Vec<GeneratedItem>,
}

impl ResultList {
    /// Start a list holding only the seed rows of `job`
    pub fn seeded(job: &Job) -> Self {
        Self {
            items: GeneratedItem::seeds(job).to_vec(),
        }
    }

    /// Assign the next contiguous id to `design` and append it
    pub fn push_design(&mut self, design: Design) -> &GeneratedItem {
        let id = self.items.len();
        let ordinal = id + 1 - SEED_COUNT;
        self.items.push(GeneratedItem {
            id,
            label: design.label.unwrap_or_else(|| format!("Design {}", ordinal)),
            sequence: design.sequence,
            is_reference: false,
        });
        &self.items[id]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Designs received so far, seeds excluded
    pub fn design_len(&self) -> usize {
        self.items.len().saturating_sub(SEED_COUNT)
    }

    pub fn items(&self) -> &[GeneratedItem] {
        &self.items
    }
}
