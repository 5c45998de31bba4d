use et_types::topology::{SCP_LINE_BYTES, SCP_NUM_LINES};

/// A core's private 64-line × 64-byte scratchpad — used both for the L1
/// scratchpad proper and, with an identical layout, the "TenB" overflow
/// extension paired with it. Line status tracking (`Invalid/Fill/Valid/...`)
/// is verification metadata and isn't architectural state, so
/// it's left to the observability hook rather than modelled here.
#[derive(Debug, Clone)]
pub struct ScratchpadLines {
    lines: Vec<[u8; SCP_LINE_BYTES]>,
}

impl ScratchpadLines {
    pub fn new() -> Self {
        ScratchpadLines {
            lines: vec![[0u8; SCP_LINE_BYTES]; SCP_NUM_LINES],
        }
    }

    pub fn line(&self, index: usize) -> &[u8; SCP_LINE_BYTES] {
        &self.lines[index % SCP_NUM_LINES]
    }

    pub fn line_mut(&mut self, index: usize) -> &mut [u8; SCP_LINE_BYTES] {
        let i = index % SCP_NUM_LINES;
        &mut self.lines[i]
    }
}

impl Default for ScratchpadLines {
    fn default() -> Self {
        Self::new()
    }
}

/// The 32-vector "TenC" accumulator bank used by the integer-MAC tensor
/// FMA (`IMA8A32`) and as the general FMA accumulator register file.
/// Vectors are `VL` 32-bit lanes wide.
#[derive(Debug, Clone)]
pub struct TenC {
    vectors: Vec<[u32; et_types::topology::VL]>,
}

impl TenC {
    pub fn new() -> Self {
        TenC {
            vectors: vec![[0u32; et_types::topology::VL]; 32],
        }
    }

    pub fn vector(&self, index: usize) -> &[u32; et_types::topology::VL] {
        &self.vectors[index % 32]
    }

    pub fn vector_mut(&mut self, index: usize) -> &mut [u32; et_types::topology::VL] {
        let i = index % 32;
        &mut self.vectors[i]
    }
}

impl Default for TenC {
    fn default() -> Self {
        Self::new()
    }
}
