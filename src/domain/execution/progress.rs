use std::fmt;

/// Progress line shown above a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 0-based server step index.
    pub step_index: usize,
    pub total_steps: usize,
    /// 1-based item position and item count inside a randomizer.
    pub item: Option<(usize, usize)>,
}

impl Progress {
    pub fn new(step_index: usize, total_steps: usize) -> Self {
        Self {
            step_index,
            total_steps,
            item: None,
        }
    }

    pub fn with_item(mut self, position: usize, count: usize) -> Self {
        self.item = Some((position, count));
        self
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} / {}", self.step_index + 1, self.total_steps)?;
        if let Some((position, count)) = self.item {
            write!(f, " ({position}/{count})")?;
        }
        Ok(())
    }
}
