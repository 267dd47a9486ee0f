use super::{DeadLetter, DeadLetterError, DeadLetterSink};
use async_trait::async_trait;
use parking_lot::Mutex;

/// In-memory sink, used by tests
#[derive(Default)]
pub struct MemoryDeadLetters {
    letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }
}

#[async_trait]
impl DeadLetterSink for MemoryDeadLetters {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError> {
        self.letters.lock().push(letter.clone());
        Ok(())
    }
}
