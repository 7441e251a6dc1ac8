use cow_operator_types::{Task, TaskId};
use std::collections::HashSet;

use crate::{MatchingError, MAX_PARTITION_TASKS};

/// One way of splitting a batch into disjoint groups
pub type Partition<'a> = Vec<Vec<&'a Task>>;

/// Canonical form of a partition: sorted groups of sorted task ids
pub type PartitionKey = Vec<Vec<TaskId>>;

pub fn partition_key(partition: &[Vec<&Task>]) -> PartitionKey {
    let mut key: PartitionKey = partition
        .iter()
        .map(|group| {
            let mut ids: Vec<TaskId> = group.iter().map(|t| t.task_id).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    key.sort();
    key
}

/// Lazily enumerates every set partition of a task list.
///
/// Follows the recursive construction: each partition of the first `k` tasks
/// is extended by placing task `k` either in a new group or in exactly one of
/// the existing groups. The recursion is unrolled into a choice vector where
/// `choices[i] == 0` opens a new group and `choices[i] == j` joins group
/// `j - 1`. Every choice vector maps to a distinct partition, so nothing is
/// emitted twice and only one partition is held in memory at a time.
///
/// The first partition yielded puts every task in its own group.
pub struct PartitionIter<'a> {
    tasks: Vec<&'a Task>,
    choices: Vec<usize>,
    exhausted: bool,
}

impl<'a> PartitionIter<'a> {
    fn new(tasks: Vec<&'a Task>) -> Self {
        let exhausted = tasks.is_empty();
        Self {
            choices: vec![0; tasks.len()],
            tasks,
            exhausted,
        }
    }

    /// Number of groups opened by the tasks before `index`
    fn groups_before(&self, index: usize) -> usize {
        self.choices[..index].iter().filter(|&&c| c == 0).count()
    }

    fn build(&self) -> Partition<'a> {
        let mut groups: Partition<'a> = Vec::new();
        for (task, &choice) in self.tasks.iter().zip(&self.choices) {
            if choice == 0 {
                groups.push(vec![*task]);
            } else {
                groups[choice - 1].push(*task);
            }
        }
        groups
    }

    fn advance(&mut self) {
        for index in (1..self.choices.len()).rev() {
            if self.choices[index] < self.groups_before(index) {
                self.choices[index] += 1;
                for later in &mut self.choices[index + 1..] {
                    *later = 0;
                }
                return;
            }
        }
        self.exhausted = true;
    }
}

impl<'a> Iterator for PartitionIter<'a> {
    type Item = Partition<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let partition = self.build();
        self.advance();
        Some(partition)
    }
}

/// Drop repeated task ids, keeping the first occurrence
fn distinct_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut seen = HashSet::new();
    tasks.iter().filter(|t| seen.insert(t.task_id)).collect()
}

/// Lazy partition enumeration over `tasks`.
///
/// An empty task list yields nothing; tasks repeated by id are enumerated once.
pub fn partitions(tasks: &[Task]) -> Result<PartitionIter<'_>, MatchingError> {
    let distinct = distinct_tasks(tasks);
    if distinct.len() > MAX_PARTITION_TASKS {
        return Err(MatchingError::BatchTooLarge {
            count: distinct.len(),
            max: MAX_PARTITION_TASKS,
        });
    }
    Ok(PartitionIter::new(distinct))
}

/// Materialize every partition of `tasks`, deduplicated by [`PartitionKey`]
pub fn generate_partitions(tasks: &[Task]) -> Result<Vec<Partition<'_>>, MatchingError> {
    let mut seen: HashSet<PartitionKey> = HashSet::new();
    Ok(partitions(tasks)?
        .filter(|partition| seen.insert(partition_key(partition)))
        .collect())
}
