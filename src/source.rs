//! One-shot record sequences whose backing resource lives only as long as
//! the callback that consumes them.

use crate::errors::MigrationError;

pub type Records<'a, T> = Box<dyn Iterator<Item = Result<T, MigrationError>> + 'a>;

pub trait RecordSource<T>: Send + Sync {
    /// Open the source and hand its records to `f` exactly once. Handles are
    /// released when this returns, whatever `f` did.
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, T>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError>;
}

pub trait RecordSourceExt<T>: RecordSource<T> {
    /// Run `f` over the records and return what it computes.
    fn process<R, F>(&self, f: F) -> Result<R, MigrationError>
    where
        F: FnOnce(Records<'_, T>) -> Result<R, MigrationError>,
    {
        let mut f = Some(f);
        let mut output = None;
        self.with_records(&mut |records| {
            if let Some(f) = f.take() {
                output = Some(f(records)?);
            }
            Ok(())
        })?;
        output.ok_or_else(|| {
            MigrationError::Io(std::io::Error::other(
                "record source returned without yielding its records",
            ))
        })
    }
}

impl<T, S: RecordSource<T> + ?Sized> RecordSourceExt<T> for S {}

/// In-memory source, used for tests and for already-loaded data.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone + Send + Sync> RecordSource<T> for VecSource<T> {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, T>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        f(Box::new(self.items.iter().cloned().map(Ok)))
    }
}
