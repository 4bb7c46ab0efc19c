use tokio::task::JoinHandle;

/// Background task owned by the page layer. Aborts the task on drop.
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Check if the task stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
