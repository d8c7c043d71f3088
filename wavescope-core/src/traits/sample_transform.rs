/// A pure frame-to-frame transform applied to decoded audio in real time.
///
/// `process` returns a frame of the same length as its input (empty in, empty
/// out). Implementations keep any recurrence state private and are called
/// from one producer thread at a time.
pub trait SampleTransform: Send + Sync {
    fn process(&self, frame: &[f32]) -> Vec<f32>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "transform"
    }
}

/// Adapts a closure into a [`SampleTransform`].
pub struct FnTransform<F> {
    name: String,
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> SampleTransform for FnTransform<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    fn process(&self, frame: &[f32]) -> Vec<f32> {
        (self.func)(frame)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
