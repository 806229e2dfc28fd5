use std::collections::HashMap;
use std::sync::Mutex;

use codeforge_core::CodingResult;

/// Process-owned store of finished task results.
///
/// Constructed once at startup and shared by reference with whoever
/// needs lookup; its lifecycle is tied to the process, not to any
/// individual workflow.
#[derive(Default)]
pub struct ResultStore {
    inner: Mutex<HashMap<String, CodingResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, result: CodingResult) {
        let mut inner = self.inner.lock().expect("result store poisoned");
        inner.insert(result.task_id.clone(), result);
    }

    pub fn get(&self, task_id: &str) -> Option<CodingResult> {
        let inner = self.inner.lock().expect("result store poisoned");
        inner.get(task_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("result store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
