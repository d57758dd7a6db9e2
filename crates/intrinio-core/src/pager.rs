/// Records per page requested from every paginated endpoint.
pub const PAGE_SIZE: u32 = 100;

/// Where a global sequence number lands once the result set is paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    /// 1-based page number
    pub page_number: u32,
    /// 0-based index within the page
    pub offset: usize,
}

impl PagePosition {
    pub fn of(sequence: u32) -> Self {
        Self {
            page_number: page_number(sequence),
            offset: page_offset(sequence),
        }
    }

    /// Inverse of [`PagePosition::of`].
    pub fn sequence(&self) -> u32 {
        (self.page_number - 1) * PAGE_SIZE + self.offset as u32
    }
}

/// `ceil((sequence + 1) / PAGE_SIZE)`
pub fn page_number(sequence: u32) -> u32 {
    sequence / PAGE_SIZE + 1
}

pub fn page_offset(sequence: u32) -> usize {
    (sequence - (page_number(sequence) - 1) * PAGE_SIZE) as usize
}
