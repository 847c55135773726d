//! Enumeration of every output record in an automata.
//!
//! Output records are laid out contiguously from the header's
//! `first_output` up to `first_output_list`, independent of which nodes
//! refer to them.

use crate::callback::{Command, OutputCallback};
use crate::engine::Engine;
use crate::error::{EudoxusError, Result, Status};
use crate::image::{AutomataImage, OutputRecord};

/// Iterator over all output records.
#[derive(Debug, Clone)]
pub struct OutputIter<'a> {
    image: &'a AutomataImage,
    next: u64,
    end: u64,
    done: bool,
}

impl<'a> OutputIter<'a> {
    pub(crate) fn new(image: &'a AutomataImage) -> Self {
        let header = image.header();
        let end = header.first_output_list.min(header.data_length);
        Self {
            image,
            next: header.first_output,
            end,
            done: header.first_output == 0,
        }
    }
}

impl<'a> Iterator for OutputIter<'a> {
    type Item = Result<OutputRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.end {
            return None;
        }

        match self.image.output(self.next) {
            Ok(record) => {
                self.next = record.end();
                Some(Ok(record))
            }
            Err(err) => {
                self.done = true;
                Some(Err(EudoxusError::from(err)))
            }
        }
    }
}

impl Engine {
    /// Call `callback` for every output in the automata, with position 0.
    ///
    /// Returns [`Status::Ok`] once all outputs were visited, or
    /// [`Status::Stop`] if the callback stopped.
    pub fn all_outputs<C: OutputCallback>(&self, mut callback: C) -> Result<Status> {
        self.set_error(None);
        for record in self.outputs() {
            let record = record.map_err(|err| self.fail(err))?;
            match callback.on_output(record.data, 0) {
                Command::Continue => {}
                Command::Stop => return Ok(Status::Stop),
                Command::Error => return Err(self.fail(EudoxusError::Callback)),
            }
        }
        Ok(Status::Ok)
    }

    /// Iterate every output record.
    pub fn outputs(&self) -> OutputIter<'_> {
        OutputIter::new(self.image())
    }
}
