//! 错误事件出口

use std::sync::Arc;

use kvbridge_errors::ErrorEvent;
use parking_lot::Mutex;

/// 错误事件接收端
pub trait ErrorSink: Send + Sync {
    fn emit(&self, event: &ErrorEvent);
}

impl<F> ErrorSink for F
where
    F: Fn(&ErrorEvent) + Send + Sync,
{
    fn emit(&self, event: &ErrorEvent) {
        self(event)
    }
}

/// 在内存中收集事件
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ErrorEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<ErrorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ErrorSink for CollectingSink {
    fn emit(&self, event: &ErrorEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbridge_errors::Platform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        let shared = sink.clone();

        shared.emit(&ErrorEvent::new(Platform::CacheBackend, "get", "boom"));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].op, "get");

        let taken = sink.take();
        assert_eq!(taken.len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let sink = move |_: &ErrorEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        };

        sink.emit(&ErrorEvent::new(Platform::FallbackBackend, "del", "boom"));
        sink.emit(&ErrorEvent::new(Platform::FallbackBackend, "del", "boom"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
