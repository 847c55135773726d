//! Metadata table.
//!
//! Metadata is a run of `(key, value)` output record pairs starting at the
//! header's `metadata_index` and running to the end of the automata. Keys
//! and values are arbitrary bytes; by convention keys are ASCII names such
//! as `Output-Type`.

use crate::engine::Engine;
use crate::error::{EudoxusError, Result, Status};
use crate::image::AutomataImage;

/// Iterator over metadata `(key, value)` pairs.
///
/// Yields an error and then stops if a record crosses the end of the
/// automata, or up front if the header sets a metadata index with a zero
/// metadata count.
#[derive(Debug, Clone)]
pub struct MetadataIter<'a> {
    image: &'a AutomataImage,
    next: u64,
    done: bool,
    /// Index set with a zero count; reported before any pair.
    missing_count: bool,
}

impl<'a> MetadataIter<'a> {
    pub(crate) fn new(image: &'a AutomataImage) -> Self {
        let header = image.header();
        let start = header.metadata_index;
        Self {
            image,
            next: start,
            done: start == 0,
            missing_count: start != 0 && header.num_metadata == 0,
        }
    }

    fn read_pair(&self) -> Result<(&'a [u8], &'a [u8], u64)> {
        let key = self.image.output(self.next).map_err(|err| {
            EudoxusError::Invalid(format!("metadata key crosses end of automata: {err}"))
        })?;
        let value = self.image.output(key.end()).map_err(|err| {
            EudoxusError::Invalid(format!("metadata value crosses end of automata: {err}"))
        })?;
        Ok((key.data, value.data, value.end()))
    }
}

impl<'a> Iterator for MetadataIter<'a> {
    type Item = Result<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.missing_count {
            self.done = true;
            return Some(Err(EudoxusError::Invalid(
                "metadata index set but no metadata".to_string(),
            )));
        }
        if self.next >= self.image.data_length() {
            return None;
        }

        match self.read_pair() {
            Ok((key, value, end)) => {
                self.next = end;
                Some(Ok((key, value)))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl Engine {
    /// Call `f` for every metadata pair until it returns `false`.
    ///
    /// Returns [`Status::End`] when every pair was visited (including when
    /// there is no metadata) and [`Status::Stop`] when `f` stopped early.
    pub fn metadata<'a, F>(&'a self, mut f: F) -> Result<Status>
    where
        F: FnMut(&'a [u8], &'a [u8]) -> bool,
    {
        self.set_error(None);
        for pair in self.metadata_iter() {
            let (key, value) = pair.map_err(|err| self.fail(err))?;
            if !f(key, value) {
                return Ok(Status::Stop);
            }
        }
        Ok(Status::End)
    }

    /// Value of the first metadata pair whose key is `key`.
    pub fn metadata_with_key(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        let mut found = None;
        let status = self.metadata(|k, v| {
            if k == key {
                found = Some(v);
                false
            } else {
                true
            }
        })?;

        Ok(match status {
            Status::Stop => found,
            _ => None,
        })
    }

    /// Iterate metadata pairs.
    pub fn metadata_iter(&self) -> MetadataIter<'_> {
        MetadataIter::new(self.image())
    }

    pub(crate) fn fail(&self, err: EudoxusError) -> EudoxusError {
        self.record_error(&err);
        err
    }
}
