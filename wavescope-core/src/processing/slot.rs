use std::sync::Arc;

use crate::traits::sample_transform::SampleTransform;

/// Holds at most one active transform plus the most recently dispatched frame.
///
/// Not synchronized on its own. Frames come back as `Arc<[f32]>` so the caller
/// can release its lock before handing them to a sink.
#[derive(Default)]
pub struct ProcessingSlot {
    transform: Option<Arc<dyn SampleTransform>>,
    last_frame: Option<Arc<[f32]>>,
}

impl ProcessingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.transform.is_some()
    }

    /// Install `transform`, replacing any previous one.
    ///
    /// Returns `false` when this exact instance is already installed.
    pub fn install(&mut self, transform: Arc<dyn SampleTransform>) -> bool {
        if let Some(current) = &self.transform {
            if Arc::ptr_eq(current, &transform) {
                return false;
            }
        }
        self.transform = Some(transform);
        true
    }

    /// Remove the active transform, returning it.
    pub fn remove(&mut self) -> Option<Arc<dyn SampleTransform>> {
        self.transform.take()
    }

    /// Run `frame` through the active transform (if any) and cache the result.
    pub fn apply(&mut self, frame: Vec<f32>) -> Arc<[f32]> {
        let output: Arc<[f32]> = match &self.transform {
            Some(transform) => transform.process(&frame).into(),
            None => frame.into(),
        };
        self.last_frame = Some(Arc::clone(&output));
        output
    }

    /// Re-run the cached frame through the active transform.
    ///
    /// `None` when nothing has been captured yet or no transform is installed.
    pub fn rerender(&mut self) -> Option<Arc<[f32]>> {
        let transform = self.transform.as_ref()?;
        let cached = self.last_frame.as_ref()?;
        let output: Arc<[f32]> = transform.process(cached).into();
        self.last_frame = Some(Arc::clone(&output));
        Some(output)
    }

    pub fn last_frame(&self) -> Option<&[f32]> {
        self.last_frame.as_deref()
    }
}
