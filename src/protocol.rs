use crate::types::PoseFields;
use crate::{Result, WebArError};

// -- Layout identification --
/// "WXRP" read as a little-endian u32.
pub const POSE_MAGIC: u32 = u32::from_le_bytes(*b"WXRP");
pub const LAYOUT_VERSION: u32 = 3;

// -- Cell geometry --
pub const MATRIX_CELLS: usize = 16;
pub const POSITION_CELLS: usize = 3;
pub const MAX_CELLS: usize = MATRIX_CELLS * 2 + POSITION_CELLS;

/// Column-major 4x4 identity.
pub const IDENTITY_MATRIX: [f32; MATRIX_CELLS] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Number of f32 cells a layout with `fields` occupies.
pub fn cell_count(fields: PoseFields) -> usize {
    let mut count = 0;
    if fields.contains(PoseFields::VIEW) {
        count += MATRIX_CELLS;
    }
    if fields.contains(PoseFields::PROJECTION) {
        count += MATRIX_CELLS;
    }
    if fields.contains(PoseFields::POSITION) {
        count += POSITION_CELLS;
    }
    count
}

/// Layout a provider declares when it is initialized.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutDescriptor {
    pub magic: u32,
    pub version: u32,
    pub fields: PoseFields,
}

impl LayoutDescriptor {
    /// The layout this crate speaks for the given field set.
    pub fn current(fields: PoseFields) -> Self {
        Self {
            magic: POSE_MAGIC,
            version: LAYOUT_VERSION,
            fields,
        }
    }

    /// Check a provider's declaration against what the consumer expects.
    pub fn validate(&self, expected: PoseFields) -> Result<()> {
        if self.magic != POSE_MAGIC || self.version != LAYOUT_VERSION {
            return Err(WebArError::LayoutMismatch {
                expected_magic: POSE_MAGIC,
                expected_version: LAYOUT_VERSION,
                magic: self.magic,
                version: self.version,
            });
        }
        if self.fields != expected {
            return Err(WebArError::FieldMismatch {
                expected,
                declared: self.fields,
            });
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        cell_count(self.fields)
    }
}

/// One frame of pose data.
///
/// Cell layout (f32, by position):
/// - `[0..16]`: view matrix, column-major, provider convention
/// - `[16..32]`: projection matrix, if `PROJECTION`
/// - next 3: redundant position `[x, y, z]`, if `POSITION`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseBuffer {
    pub view: [f32; MATRIX_CELLS],
    pub projection: Option<[f32; MATRIX_CELLS]>,
    pub position: Option<[f32; POSITION_CELLS]>,
}

impl Default for PoseBuffer {
    fn default() -> Self {
        Self {
            view: IDENTITY_MATRIX,
            projection: None,
            position: None,
        }
    }
}

impl PoseBuffer {
    /// Parse `cells` in place. Fields absent from `fields` are cleared.
    pub fn load(&mut self, fields: PoseFields, cells: &[f32]) -> Result<()> {
        let needed = cell_count(fields);
        if cells.len() < needed {
            return Err(WebArError::ShortBuffer {
                needed,
                got: cells.len(),
            });
        }

        let mut offset = 0;
        if fields.contains(PoseFields::VIEW) {
            self.view.copy_from_slice(&cells[offset..offset + MATRIX_CELLS]);
            offset += MATRIX_CELLS;
        }

        if fields.contains(PoseFields::PROJECTION) {
            let projection = self.projection.get_or_insert([0.0; MATRIX_CELLS]);
            projection.copy_from_slice(&cells[offset..offset + MATRIX_CELLS]);
            offset += MATRIX_CELLS;
        } else {
            self.projection = None;
        }

        if fields.contains(PoseFields::POSITION) {
            let position = self.position.get_or_insert([0.0; POSITION_CELLS]);
            position.copy_from_slice(&cells[offset..offset + POSITION_CELLS]);
        } else {
            self.position = None;
        }

        Ok(())
    }

    /// Write the layout for `fields` into `out`, returning the cell count.
    /// Optional fields the buffer does not hold are written as zeros.
    pub fn store(&self, fields: PoseFields, out: &mut [f32]) -> Result<usize> {
        let needed = cell_count(fields);
        if out.len() < needed {
            return Err(WebArError::ShortBuffer {
                needed,
                got: out.len(),
            });
        }

        let mut offset = 0;
        if fields.contains(PoseFields::VIEW) {
            out[offset..offset + MATRIX_CELLS].copy_from_slice(&self.view);
            offset += MATRIX_CELLS;
        }
        if fields.contains(PoseFields::PROJECTION) {
            let projection = self.projection.unwrap_or([0.0; MATRIX_CELLS]);
            out[offset..offset + MATRIX_CELLS].copy_from_slice(&projection);
            offset += MATRIX_CELLS;
        }
        if fields.contains(PoseFields::POSITION) {
            let position = self.position.unwrap_or([0.0; POSITION_CELLS]);
            out[offset..offset + POSITION_CELLS].copy_from_slice(&position);
            offset += POSITION_CELLS;
        }

        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_bytes() {
        assert_eq!(POSE_MAGIC, 0x5052_5857);
        assert_eq!(POSE_MAGIC.to_le_bytes(), *b"WXRP");
    }

    #[test]
    fn test_cell_count() {
        assert_eq!(cell_count(PoseFields::VIEW), 16);
        assert_eq!(cell_count(PoseFields::VIEW | PoseFields::PROJECTION), 32);
        assert_eq!(cell_count(PoseFields::VIEW | PoseFields::POSITION), 19);
        assert_eq!(cell_count(PoseFields::all()), MAX_CELLS);
    }

    #[test]
    fn test_validate_accepts_current() {
        let fields = PoseFields::VIEW | PoseFields::PROJECTION;
        assert!(LayoutDescriptor::current(fields).validate(fields).is_ok());
    }

    #[test]
    fn test_validate_rejects_version() {
        let mut declared = LayoutDescriptor::current(PoseFields::VIEW);
        declared.version = 2;
        assert!(matches!(
            declared.validate(PoseFields::VIEW),
            Err(WebArError::LayoutMismatch { version: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_magic() {
        let mut declared = LayoutDescriptor::current(PoseFields::VIEW);
        declared.magic = 0;
        assert!(matches!(
            declared.validate(PoseFields::VIEW),
            Err(WebArError::LayoutMismatch { magic: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_fields() {
        let declared = LayoutDescriptor::current(PoseFields::VIEW | PoseFields::POSITION);
        assert!(matches!(
            declared.validate(PoseFields::VIEW),
            Err(WebArError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn test_load_field_order() {
        let cells: Vec<f32> = (0..MAX_CELLS).map(|i| i as f32).collect();
        let mut buffer = PoseBuffer::default();
        buffer.load(PoseFields::all(), &cells).unwrap();

        assert_eq!(buffer.view[0], 0.0);
        assert_eq!(buffer.view[15], 15.0);
        assert_eq!(buffer.projection.unwrap()[0], 16.0);
        assert_eq!(buffer.position, Some([32.0, 33.0, 34.0]));
    }

    #[test]
    fn test_load_position_without_projection() {
        let mut cells = [0.0f32; 19];
        cells[16..19].copy_from_slice(&[4.0, 5.0, 6.0]);
        let mut buffer = PoseBuffer::default();
        buffer
            .load(PoseFields::VIEW | PoseFields::POSITION, &cells)
            .unwrap();

        assert_eq!(buffer.projection, None);
        assert_eq!(buffer.position, Some([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_load_short_buffer() {
        let mut buffer = PoseBuffer::default();
        let err = buffer
            .load(PoseFields::VIEW | PoseFields::PROJECTION, &[0.0; 20])
            .unwrap_err();
        assert!(matches!(err, WebArError::ShortBuffer { needed: 32, got: 20 }));
        assert_eq!(buffer.view, IDENTITY_MATRIX);
    }

    #[test]
    fn test_store_matches_load() {
        let fields = PoseFields::VIEW | PoseFields::POSITION;
        let mut source = PoseBuffer::default();
        source.view[12] = 1.5;
        source.position = Some([1.5, 0.0, -2.0]);

        let mut cells = [0.0f32; MAX_CELLS];
        let written = source.store(fields, &mut cells).unwrap();
        assert_eq!(written, 19);

        let mut parsed = PoseBuffer::default();
        parsed.load(fields, &cells[..written]).unwrap();
        assert_eq!(parsed, source);
    }
}
