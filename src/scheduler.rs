use std::collections::BTreeMap;

pub type TaskId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    Start,
    NextLetter,
    Frame(usize),
}

/// Handle to a scheduled job, used to cancel it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskHandle {
    Timer { due: u64, id: TaskId },
    Frame { id: TaskId },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    timers: BTreeMap<(u64, TaskId), Job>,
    frames: BTreeMap<TaskId, Job>,
    next_id: TaskId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn set_timeout(&mut self, now: u64, delay: u64, job: Job) -> TaskHandle {
        let id = self.next_id();
        let due = now.saturating_add(delay);
        self.timers.insert((due, id), job);

        TaskHandle::Timer { due, id }
    }

    pub fn request_frame(&mut self, job: Job) -> TaskHandle {
        let id = self.next_id();
        self.frames.insert(id, job);

        TaskHandle::Frame { id }
    }

    /// Returns `true` if the job was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match handle {
            TaskHandle::Timer { due, id } => self.timers.remove(&(due, id)).is_some(),
            TaskHandle::Frame { id } => self.frames.remove(&id).is_some(),
        }
    }

    /// Removes the earliest timer due at or before `now`, with its due time.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, Job)> {
        let (&(due, _), _) = self.timers.first_key_value()?;
        if due > now {
            return None;
        }

        self.timers.pop_first().map(|((due, _), job)| (due, job))
    }

    /// Takes the frame callbacks pending right now. Frames requested while
    /// these run belong to the next batch.
    pub fn take_frames(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.frames).into_values().collect()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.frames.clear();
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_due_order_then_fifo() {
        let mut queue = EventQueue::new();
        queue.set_timeout(0, 100, Job::NextLetter);
        queue.set_timeout(0, 50, Job::Start);
        queue.set_timeout(50, 0, Job::Frame(3));

        assert_eq!(queue.pop_due(49), None);
        assert_eq!(queue.pop_due(200), Some((50, Job::Start)));
        assert_eq!(queue.pop_due(200), Some((50, Job::Frame(3))));
        assert_eq!(queue.pop_due(200), Some((100, Job::NextLetter)));
        assert!(queue.is_idle());
    }

    #[test]
    fn cancelled_jobs_never_run() {
        let mut queue = EventQueue::new();
        let timer = queue.set_timeout(0, 10, Job::Start);
        let frame = queue.request_frame(Job::Frame(0));
        queue.request_frame(Job::Frame(1));

        assert!(queue.cancel(timer));
        assert!(queue.cancel(frame));
        assert!(!queue.cancel(frame));

        assert_eq!(queue.pop_due(100), None);
        assert_eq!(queue.take_frames(), vec![Job::Frame(1)]);
    }

    #[test]
    fn frames_requested_during_a_batch_wait_for_the_next() {
        let mut queue = EventQueue::new();
        queue.request_frame(Job::Frame(0));

        let batch = queue.take_frames();
        assert_eq!(batch, vec![Job::Frame(0)]);
        queue.request_frame(Job::Frame(0));

        assert!(!queue.is_idle());
        assert_eq!(queue.take_frames(), vec![Job::Frame(0)]);
        assert!(queue.take_frames().is_empty());
    }
}
