//! Pose acquisition over the two transports a provider may speak.

use crate::protocol::{PoseBuffer, MAX_CELLS};
use crate::types::{PoseFields, Provider, Transport};
use std::cell::Cell;
use std::rc::Rc;

/// Consumer-owned cells the provider writes in place every frame.
///
/// Allocated once and shared by cloning the handle. The storage never moves,
/// so `as_mut_ptr` can be handed across a C boundary. Not `Send`: the writer
/// and the reader must run on the same tick thread.
#[derive(Clone)]
pub struct SharedPoseCells {
    cells: Rc<[Cell<f32>; MAX_CELLS]>,
}

impl SharedPoseCells {
    pub fn new() -> Self {
        Self {
            cells: Rc::new(std::array::from_fn(|_| Cell::new(0.0))),
        }
    }

    pub fn len(&self) -> usize {
        MAX_CELLS
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Overwrite the leading cells with `values`. Extra values are ignored.
    pub fn write(&self, values: &[f32]) {
        for (cell, &value) in self.cells.iter().zip(values) {
            cell.set(value);
        }
    }

    /// Copy the leading cells into `out`.
    pub fn read_into(&self, out: &mut [f32]) {
        for (slot, cell) in out.iter_mut().zip(self.cells.iter()) {
            *slot = cell.get();
        }
    }

    /// Stable pointer to the first of `len()` contiguous f32 cells.
    pub fn as_mut_ptr(&self) -> *mut f32 {
        self.cells.as_ptr() as *mut f32
    }
}

impl Default for SharedPoseCells {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls one frame of pose data into reusable storage.
pub struct PoseReader {
    transport: Transport,
    fields: PoseFields,
    shared: Option<SharedPoseCells>,
    scratch: [f32; MAX_CELLS],
    buffer: PoseBuffer,
}

impl PoseReader {
    pub fn new(transport: Transport, fields: PoseFields) -> Self {
        let shared = match transport {
            Transport::Shared => Some(SharedPoseCells::new()),
            Transport::Handle => None,
        };
        Self {
            transport,
            fields,
            shared,
            scratch: [0.0; MAX_CELLS],
            buffer: PoseBuffer::default(),
        }
    }

    /// Cells to hand to the provider, present for the shared transport only.
    pub fn shared_cells(&self) -> Option<SharedPoseCells> {
        self.shared.clone()
    }

    /// The most recently pulled frame.
    pub fn buffer(&self) -> &PoseBuffer {
        &self.buffer
    }

    /// Fetch the latest pose.
    ///
    /// Returns `None` when the provider has no pose this frame; the previous
    /// buffer is left untouched in that case.
    pub fn pull_pose<P: Provider + ?Sized>(&mut self, provider: &mut P) -> Option<&PoseBuffer> {
        match self.transport {
            Transport::Shared => {
                let shared = self.shared.as_ref()?;
                shared.read_into(&mut self.scratch);
                if let Err(e) = self.buffer.load(self.fields, &self.scratch) {
                    log::warn!("Discarding shared pose cells: {}", e);
                    return None;
                }
            }
            Transport::Handle => {
                let view = match provider.view_matrix() {
                    Some(view) => view,
                    None => {
                        log::trace!("No view matrix this frame, holding last pose");
                        return None;
                    }
                };
                self.buffer.view = *view;

                if self.fields.contains(PoseFields::PROJECTION) {
                    if let Some(projection) = provider.projection_matrix() {
                        self.buffer.projection = Some(*projection);
                    }
                }
            }
        }
        Some(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::protocol::{IDENTITY_MATRIX, MATRIX_CELLS};

    fn translated(x: f32, y: f32, z: f32) -> [f32; MATRIX_CELLS] {
        let mut m = IDENTITY_MATRIX;
        m[12] = x;
        m[13] = y;
        m[14] = z;
        m
    }

    #[test]
    fn test_shared_cells_pointer_writes_are_visible() {
        let cells = SharedPoseCells::new();
        assert_eq!(cells.len(), MAX_CELLS);
        assert!(!cells.is_empty());
        let alias = cells.clone();
        unsafe {
            *cells.as_mut_ptr().add(14) = 7.5;
        }
        let mut out = [0.0f32; MAX_CELLS];
        alias.read_into(&mut out);
        assert_eq!(out[14], 7.5);
    }

    #[test]
    fn test_shared_pull_reads_in_place_writes() {
        let mut reader = PoseReader::new(Transport::Shared, PoseFields::VIEW);
        let mut provider = MockProvider::new(PoseFields::VIEW);
        reader
            .shared_cells()
            .unwrap()
            .write(&translated(1.0, 2.0, 3.0));

        let buffer = reader.pull_pose(&mut provider).unwrap();
        assert_eq!(&buffer.view[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_handle_pull_copies_view() {
        let mut reader = PoseReader::new(Transport::Handle, PoseFields::VIEW);
        assert!(reader.shared_cells().is_none());

        let mut provider = MockProvider::new(PoseFields::VIEW);
        provider.set_view_matrix(Some(translated(4.0, 5.0, 6.0)));

        let buffer = reader.pull_pose(&mut provider).unwrap();
        assert_eq!(&buffer.view[12..15], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_handle_null_keeps_previous_buffer() {
        let mut reader = PoseReader::new(Transport::Handle, PoseFields::VIEW);
        let mut provider = MockProvider::new(PoseFields::VIEW);
        provider.set_view_matrix(Some(translated(1.0, 1.0, 1.0)));
        assert!(reader.pull_pose(&mut provider).is_some());

        provider.set_view_matrix(None);
        assert!(reader.pull_pose(&mut provider).is_none());
        assert_eq!(&reader.buffer().view[12..15], &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_handle_projection_held_when_null() {
        let fields = PoseFields::VIEW | PoseFields::PROJECTION;
        let mut reader = PoseReader::new(Transport::Handle, fields);
        let mut provider = MockProvider::new(fields);

        let mut projection = IDENTITY_MATRIX;
        projection[0] = 2.0;
        provider.set_view_matrix(Some(IDENTITY_MATRIX));
        provider.set_projection_matrix(Some(projection));
        assert!(reader.pull_pose(&mut provider).is_some());

        provider.set_projection_matrix(None);
        let buffer = reader.pull_pose(&mut provider).unwrap();
        assert_eq!(buffer.projection.unwrap()[0], 2.0);
    }
}
