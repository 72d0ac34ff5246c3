#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressPhase {
    Remapping,
    Committing,
}

#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
        class: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
    ClassFailed(String),
    Exit,
}
