use alloc::rc::Rc;
use core::cell::Cell;

/// Records the value of the last dropped [`Foo`] and how many were dropped.
#[derive(Clone, Default)]
pub(crate) struct DropSink(Rc<(Cell<Option<i32>>, Cell<usize>)>);

impl DropSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn last(&self) -> Option<i32> {
        self.0.0.get()
    }

    pub(crate) fn drops(&self) -> usize {
        self.0.1.get()
    }
}

pub(crate) struct Foo {
    pub(crate) value: i32,
    sink: Option<DropSink>,
}

impl Foo {
    pub(crate) fn new(value: i32, factor: i32) -> Self {
        Self {
            value: value * factor,
            sink: None,
        }
    }

    pub(crate) fn tracked(mut self, sink: &DropSink) -> Self {
        self.sink = Some(sink.clone());
        self
    }
}

impl Default for Foo {
    fn default() -> Self {
        Self::new(5, 1)
    }
}

impl Drop for Foo {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.0.0.set(Some(self.value));
            sink.0.1.set(sink.0.1.get() + 1);
        }
    }
}
