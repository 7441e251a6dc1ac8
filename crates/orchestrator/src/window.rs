use std::collections::{HashMap, VecDeque};

use cow_operator_types::{BatchId, Task, TaskId};

/// Task list handed off when a batch closes. Never mutated after close.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedBatch {
    pub batch_id: BatchId,
    /// Height that triggered the close
    pub closed_at: u64,
    pub tasks: Vec<Task>,
}

/// What a new block did to the window
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// First height observed; a batch opened with nothing to close
    Opened(BatchId),
    /// The open batch reached its length and a new one opened
    Rolled { closed: ClosedBatch, opened: BatchId },
    Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Added(BatchId),
    /// No batch was open; one opened at the task's creation block
    OpenedWith(BatchId),
    /// The task id was already accepted, into the batch given
    Duplicate(BatchId),
}

/// Block-height batch windows.
///
/// Exactly one batch is open once any block or task has been seen. A task id
/// is accepted at most once while it is among the last `seen_capacity` ids.
#[derive(Debug)]
pub struct BatchWindow {
    max_blocks: u64,
    current: Option<BatchId>,
    batches: HashMap<BatchId, Vec<Task>>,
    seen: HashMap<TaskId, BatchId>,
    seen_order: VecDeque<TaskId>,
    seen_capacity: usize,
}

impl BatchWindow {
    pub fn new(max_blocks: u64, seen_capacity: usize) -> Self {
        Self {
            max_blocks,
            current: None,
            batches: HashMap::new(),
            seen: HashMap::new(),
            seen_order: VecDeque::new(),
            seen_capacity: seen_capacity.max(1),
        }
    }

    pub fn current(&self) -> Option<BatchId> {
        self.current
    }

    /// Tasks in the open batch
    pub fn open_tasks(&self) -> &[Task] {
        self.current
            .and_then(|id| self.batches.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn on_block(&mut self, height: u64) -> BlockOutcome {
        let Some(current) = self.current else {
            return BlockOutcome::Opened(self.open(height));
        };

        if height.saturating_sub(current.opened_at()) < self.max_blocks {
            return BlockOutcome::Unchanged;
        }

        let tasks = self.batches.remove(&current).unwrap_or_default();
        let opened = self.open(height);
        BlockOutcome::Rolled {
            closed: ClosedBatch {
                batch_id: current,
                closed_at: height,
                tasks,
            },
            opened,
        }
    }

    pub fn push_task(&mut self, task: Task) -> PushOutcome {
        let task_id = task.task_id;
        if let Some(batch_id) = self.seen.get(&task_id) {
            return PushOutcome::Duplicate(*batch_id);
        }

        let (batch_id, opened) = match self.current {
            Some(id) => (id, false),
            None => (self.open(u64::from(task.task_created_block)), true),
        };

        // The open batch may outgrow the remembered range
        let tasks = self.batches.entry(batch_id).or_default();
        if tasks.iter().any(|t| t.task_id == task_id) {
            return PushOutcome::Duplicate(batch_id);
        }
        tasks.push(task);
        self.remember(task_id, batch_id);

        if opened {
            PushOutcome::OpenedWith(batch_id)
        } else {
            PushOutcome::Added(batch_id)
        }
    }

    fn remember(&mut self, task_id: TaskId, batch_id: BatchId) {
        self.seen.insert(task_id, batch_id);
        self.seen_order.push_back(task_id);
        while self.seen_order.len() > self.seen_capacity {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    fn open(&mut self, height: u64) -> BatchId {
        let id = BatchId(height);
        self.batches.insert(id, Vec::new());
        self.current = Some(id);
        id
    }
}
