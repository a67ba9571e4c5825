use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MIN_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 200;

/// A caller's page request after defaults and server-side clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let page_size = page_size
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(i64::from(MIN_PAGE_SIZE), i64::from(MAX_PAGE_SIZE)) as u32;

        Self { page, page_size }
    }

    /// Clamps the requested page into the range that exists for `total_items`.
    /// A page past the end resolves to the last page.
    pub fn resolve(&self, total_items: i64) -> PageWindow {
        let total_items = total_items.max(0);
        let total_pages = (total_items as u64)
            .div_ceil(u64::from(self.page_size))
            .max(1)
            .min(u64::from(u32::MAX)) as u32;
        let page = self.page.clamp(1, total_pages);

        PageWindow {
            page,
            page_size: self.page_size,
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: u32,
}

impl PageWindow {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}
